use log::debug;
use serde::Serialize;
use std::cmp::Ordering;

use crate::config::{Direction, MissingValuePolicy, ScoreError};
use crate::shaper::{EntityRecord, EntityTable};

/// Anything that can hand out named numeric fields to a score model.
pub trait FieldLookup {
    fn key(&self) -> &str;
    fn value(&self, field: &str) -> Option<f64>;
}

impl FieldLookup for EntityRecord {
    fn key(&self) -> &str {
        &self.key
    }

    fn value(&self, field: &str) -> Option<f64> {
        self.get(field)
    }
}

/// One weighted, range-normalized input of a composite score.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct ScoreTerm {
    pub field: String,
    pub weight: f64,
    pub min: f64,
    pub max: f64,
    pub direction: Direction,
}

impl ScoreTerm {
    pub fn higher(field: &str, min: f64, max: f64, weight: f64) -> ScoreTerm {
        ScoreTerm {
            field: field.to_string(),
            weight,
            min,
            max,
            direction: Direction::HigherIsBetter,
        }
    }

    pub fn lower(field: &str, min: f64, max: f64, weight: f64) -> ScoreTerm {
        ScoreTerm {
            field: field.to_string(),
            weight,
            min,
            max,
            direction: Direction::LowerIsBetter,
        }
    }

    fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// Position of the value in the range, in [0, 1]. Out-of-range values are clamped.
    fn normalized(&self, value: f64) -> f64 {
        (value.clamp(self.min, self.max) - self.min) / (self.max - self.min)
    }

    /// The signed contribution of this term to the total.
    ///
    /// Goodness terms land in [0, weight]; badness terms in [-weight, 0].
    pub fn contribution(&self, value: Option<f64>, missing: MissingValuePolicy) -> f64 {
        let v = match (value, missing) {
            (Some(v), _) => v,
            (None, MissingValuePolicy::NeutralMidpoint) => self.midpoint(),
            (None, MissingValuePolicy::Exclude) => return 0.0,
        };
        let part = self.normalized(v) * self.weight;
        match self.direction {
            Direction::HigherIsBetter => part,
            Direction::LowerIsBetter => -part,
        }
    }

    fn check(&self) -> Result<(), ScoreError> {
        if !(self.min.is_finite() && self.max.is_finite() && self.max > self.min) {
            return Err(ScoreError::InvalidRange {
                field: self.field.clone(),
                min: self.min,
                max: self.max,
            });
        }
        if !(self.weight.is_finite() && self.weight >= 0.0) {
            return Err(ScoreError::InvalidWeight {
                field: self.field.clone(),
                weight: self.weight,
            });
        }
        Ok(())
    }
}

/// A fixed weighted sum over normalized fields.
///
/// The ranges are constants of the model: the score of an entity never
/// depends on the other entities being scored.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct ScoreModel {
    terms: Vec<ScoreTerm>,
    missing: MissingValuePolicy,
}

impl ScoreModel {
    pub fn new(terms: Vec<ScoreTerm>, missing: MissingValuePolicy) -> Result<ScoreModel, ScoreError> {
        for t in terms.iter() {
            t.check()?;
        }
        Ok(ScoreModel { terms, missing })
    }

    /// The model used for the country education report cards.
    pub fn country_summary() -> ScoreModel {
        ScoreModel {
            terms: vec![
                ScoreTerm::higher("math_score", 300.0, 600.0, 30.0),
                ScoreTerm::higher("ESCS", -1.5, 1.5, 30.0),
                ScoreTerm::higher("HISEI", 0.0, 100.0, 50.0),
                ScoreTerm::higher("HISCED", 0.0, 10.0, 10.0),
                ScoreTerm::higher("sense_of_belonging", -1.0, 1.0, 20.0),
                ScoreTerm::higher("feeling_safe", -1.0, 1.0, 20.0),
                ScoreTerm::lower("bullying", -1.0, 1.0, 25.0),
            ],
            missing: MissingValuePolicy::NeutralMidpoint,
        }
    }

    pub fn with_missing_values(self, missing: MissingValuePolicy) -> ScoreModel {
        ScoreModel {
            terms: self.terms,
            missing,
        }
    }

    pub fn terms(&self) -> &[ScoreTerm] {
        &self.terms
    }

    pub fn missing_values(&self) -> MissingValuePolicy {
        self.missing
    }

    pub fn score<E: FieldLookup + ?Sized>(&self, entity: &E) -> f64 {
        self.terms
            .iter()
            .map(|t| t.contribution(entity.value(&t.field), self.missing))
            .sum()
    }

    /// The signed contribution of every term, in model order.
    pub fn breakdown<E: FieldLookup + ?Sized>(&self, entity: &E) -> Vec<(String, f64)> {
        self.terms
            .iter()
            .map(|t| (t.field.clone(), t.contribution(entity.value(&t.field), self.missing)))
            .collect()
    }
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct RankedEntity {
    /// 1 for the best entity.
    pub rank: usize,
    pub key: String,
    pub score: f64,
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct Ranking {
    pub best: Option<RankedEntity>,
    pub lowest: Option<RankedEntity>,
    pub all: Vec<RankedEntity>,
}

/// Orders scores from best to worst. Equal scores are ordered by key.
pub fn rank_scores(scores: Vec<(String, f64)>) -> Ranking {
    let mut sorted = scores;
    sorted.sort_by(|(ka, sa), (kb, sb)| match sb.total_cmp(sa) {
        Ordering::Equal => ka.cmp(kb),
        o => o,
    });
    let all: Vec<RankedEntity> = sorted
        .into_iter()
        .enumerate()
        .map(|(idx, (key, score))| RankedEntity {
            rank: idx + 1,
            key,
            score,
        })
        .collect();
    Ranking {
        best: all.first().cloned(),
        lowest: all.last().cloned(),
        all,
    }
}

/// Scores every entity with the model and ranks them.
pub fn rank<'a, E, I>(entities: I, model: &ScoreModel) -> Ranking
where
    E: FieldLookup + 'a,
    I: IntoIterator<Item = &'a E>,
{
    let scores: Vec<(String, f64)> = entities
        .into_iter()
        .map(|e| {
            let s = model.score(e);
            debug!("rank: {}: {}", e.key(), s);
            (e.key().to_string(), s)
        })
        .collect();
    rank_scores(scores)
}

/// Ranks the records of a shaped table.
pub fn rank_table(table: &EntityTable, model: &ScoreModel) -> Ranking {
    rank(table.iter(), model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaper::{shape, FieldSpec};
    use crate::table::parse;
    use std::collections::BTreeMap;

    fn entity(key: &str, fields: &[(&str, Option<f64>)]) -> EntityRecord {
        EntityRecord {
            key: key.to_string(),
            fields: fields
                .iter()
                .map(|(n, v)| (n.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn higher_is_better_contribution() {
        let t = ScoreTerm::higher("math_score", 300.0, 600.0, 30.0);
        let p = MissingValuePolicy::NeutralMidpoint;
        assert!(approx(t.contribution(Some(450.0), p), 15.0));
        assert!(approx(t.contribution(Some(300.0), p), 0.0));
        assert!(approx(t.contribution(Some(600.0), p), 30.0));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let t = ScoreTerm::higher("math_score", 300.0, 600.0, 30.0);
        let p = MissingValuePolicy::NeutralMidpoint;
        assert!(approx(t.contribution(Some(1000.0), p), 30.0));
        assert!(approx(t.contribution(Some(-5.0), p), 0.0));
        let b = ScoreTerm::lower("bullying", -1.0, 1.0, 25.0);
        assert!(approx(b.contribution(Some(4.0), p), -25.0));
        assert!(approx(b.contribution(Some(-4.0), p), 0.0));
    }

    #[test]
    fn lower_is_better_is_subtracted() {
        let b = ScoreTerm::lower("bullying", -1.0, 1.0, 25.0);
        let p = MissingValuePolicy::NeutralMidpoint;
        assert!(approx(b.contribution(Some(0.0), p), -12.5));
        // More bullying is worse.
        assert!(b.contribution(Some(-0.3), p) < b.contribution(Some(-0.4), p));
    }

    #[test]
    fn missing_values() {
        let t = ScoreTerm::higher("HISEI", 0.0, 100.0, 50.0);
        assert!(approx(t.contribution(None, MissingValuePolicy::NeutralMidpoint), 25.0));
        assert!(approx(t.contribution(None, MissingValuePolicy::Exclude), 0.0));
    }

    #[test]
    fn invalid_models_are_rejected() {
        let err = ScoreModel::new(
            vec![ScoreTerm::higher("x", 1.0, 1.0, 1.0)],
            MissingValuePolicy::Exclude,
        )
        .unwrap_err();
        assert!(matches!(err, ScoreError::InvalidRange { .. }));
        let err = ScoreModel::new(
            vec![ScoreTerm::higher("x", 0.0, 1.0, f64::NAN)],
            MissingValuePolicy::Exclude,
        )
        .unwrap_err();
        assert!(matches!(err, ScoreError::InvalidWeight { .. }));
        assert!(ScoreModel::new(
            ScoreModel::country_summary().terms().to_vec(),
            MissingValuePolicy::NeutralMidpoint
        )
        .is_ok());
    }

    #[test]
    fn score_is_deterministic() {
        let model = ScoreModel::country_summary();
        let e = entity(
            "Finland",
            &[
                ("math_score", Some(484.0)),
                ("ESCS", Some(0.3)),
                ("HISEI", None),
                ("bullying", Some(-0.39)),
            ],
        );
        let first = model.score(&e);
        for _ in 0..10 {
            assert_eq!(model.score(&e).to_bits(), first.to_bits());
        }
        let total: f64 = model.breakdown(&e).iter().map(|(_, c)| c).sum();
        assert!(approx(total, first));
    }

    #[test]
    fn score_of_a_simple_model() {
        let model = ScoreModel::new(
            vec![
                ScoreTerm::higher("math_score", 300.0, 600.0, 30.0),
                ScoreTerm::lower("bullying", -1.0, 1.0, 20.0),
            ],
            MissingValuePolicy::NeutralMidpoint,
        )
        .unwrap();
        let e = entity("Finland", &[("math_score", Some(520.0)), ("bullying", Some(-0.4))]);
        // 22 - 6
        assert!(approx(model.score(&e), 16.0));
        let usa = entity("USA", &[("math_score", None), ("bullying", Some(-0.3))]);
        // 15 - 7
        assert!(approx(model.score(&usa), 8.0));
    }

    #[test]
    fn ranking_breaks_ties_by_key() {
        let r = rank_scores(vec![
            ("A".to_string(), 10.0),
            ("B".to_string(), 5.0),
            ("C".to_string(), 10.0),
        ]);
        let keys: Vec<&str> = r.all.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["A", "C", "B"]);
        assert_eq!(r.best.unwrap().key, "A");
        assert_eq!(r.lowest.unwrap().key, "B");
        assert_eq!(r.all.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![1, 2, 3]);

        // Input order does not matter.
        let r2 = rank_scores(vec![
            ("C".to_string(), 10.0),
            ("B".to_string(), 5.0),
            ("A".to_string(), 10.0),
        ]);
        assert_eq!(r2.all, r.all);
    }

    #[test]
    fn empty_ranking() {
        let r = rank_scores(vec![]);
        assert_eq!(r.best, None);
        assert_eq!(r.lowest, None);
        assert!(r.all.is_empty());
    }

    #[test]
    fn rank_a_shaped_table() {
        let t = parse(
            "country,math_score,ESCS,HISEI,HISCED,sense_of_belonging,bullying,feeling_safe\n\
             Singapore,575,0.55,80,8,0.25,-0.2,0.18\n\
             Cambodia,340,-1.2,40,4,-0.4,-0.1,-0.6\n\
             Finland,500,0.35,78,8,0.1,-0.39,0.37\n",
        )
        .unwrap();
        let spec = FieldSpec::new("country").same_name_fields(&[
            "math_score",
            "ESCS",
            "HISEI",
            "HISCED",
            "sense_of_belonging",
            "bullying",
            "feeling_safe",
        ]);
        let table = shape(&t, &spec).unwrap();
        let r = rank_table(&table, &ScoreModel::country_summary());
        assert_eq!(r.best.unwrap().key, "Singapore");
        assert_eq!(r.lowest.unwrap().key, "Cambodia");
        assert_eq!(r.all.len(), 3);
    }
}
