/*!
Data pipeline for the classroom statistics: small CSV tables of country
education statistics (PISA style) turned into typed records, composite
scores and rankings.

```
use edu_stats::*;

let text = "country,math_score,bullying\nFinland,520,-0.4\nUSA,,-0.3";
let table = parse(text)?;
let entities = shape(&table, &FieldSpec::new("country").same_name_fields(&["math_score", "bullying"]))?;

let model = ScoreModel::new(
    vec![
        ScoreTerm::higher("math_score", 300.0, 600.0, 30.0),
        ScoreTerm::lower("bullying", -1.0, 1.0, 20.0),
    ],
    MissingValuePolicy::NeutralMidpoint,
)?;
let ranking = rank_table(&entities, &model);
assert_eq!(ranking.best.map(|e| e.key), Some("Finland".to_string()));
# Ok::<(), Box<dyn std::error::Error>>(())
```

See the [manual] for the file formats.
*/

mod config;

pub mod clock;
pub mod datasets;
pub mod manual;
pub mod score;
pub mod shaper;
pub mod table;

pub use crate::clock::{day_breakdown, ClockSchedule, ClockSegment, DayBreakdown, SegmentKind};
pub use crate::config::*;
pub use crate::score::{rank, rank_scores, rank_table, FieldLookup, RankedEntity, Ranking, ScoreModel, ScoreTerm};
pub use crate::shaper::{coerce_number, shape, EntityRecord, EntityTable, FieldSpec};
pub use crate::table::{parse, RawTable, RowView};
