/*!

This is the long-form manual for `edu_stats` and the `classroom` service.

## Reading CSV

All the datasets are plain CSV text with a header line. The reader is
lenient on purpose, because the files are exported by hand from
spreadsheets:
* `\n` and `\r\n` line endings are both accepted
* fields are trimmed
* every line is one row, a quoted field never continues on the next line
* a field in double quotes may contain commas, and `""` stands for one quote
* every `"` opens or closes a quoted part, even after a space or in the
  middle of a field: `Korea, "Seoul, Busan"` has two fields
* rows shorter than the header are padded with empty values, longer rows are cut
* blank lines are ignored

An empty file is the only error.

## Missing values

A numeric cell that is empty, absent, or not a number is *missing*. It is
never turned into zero and never into `NaN`. Charts skip missing values and
the composite score replaces them with the middle of the range of the field
(this can be turned off, see `MissingValuePolicy`).

## Datasets

### `spider`

`Country Name,Country Code,<stat>,<stat>,...`

All the columns after the name and the code are numeric stats. Used by the
radar chart.

### `wellbeing`

`country,BELONG,BULLIED,FEELSAFE`

PISA well-being indexes, used by the histogram.

### `socioeconomic`

`country,ESCS,HISCED,HISEI,low_escs_math,high_escs_math`

The last two columns are the average math scores of the bottom and top ESCS
quartiles; their difference is the resource gap.

### `summary`

`country,math_score,ESCS,HISEI,HISCED,sense_of_belonging,bullying,feeling_safe`

The input of the report cards and of the composite score.

### `facts`

`country,ranking,fact1,fact2,fact3`

Slide deck facts, shown by increasing ranking.

### `clock`

`country,start_time,end_time,cram_school_start_time,cram_school_end_time`

Hours of the day as decimal numbers. A day split in several sessions lists
the times separated by `;`, for example `7;13` and `12;17`.

## Composite score

| field | range | weight | |
|---|---|---|---|
| `math_score` | 300 to 600 | 30 | higher is better |
| `ESCS` | -1.5 to 1.5 | 30 | higher is better |
| `HISEI` | 0 to 100 | 50 | higher is better |
| `HISCED` | 0 to 10 | 10 | higher is better |
| `sense_of_belonging` | -1 to 1 | 20 | higher is better |
| `feeling_safe` | -1 to 1 | 20 | higher is better |
| `bullying` | -1 to 1 | 25 | lower is better |

Values are clamped to the range and scaled to `[0, weight]`. The terms where
lower is better are subtracted. Countries with the same score are ordered by
name.

## Opinion votes

Votes are appended to a CSV file with the header
`id,timestamp,bestCountry,worstCountry`. The file is never rewritten.
*/
