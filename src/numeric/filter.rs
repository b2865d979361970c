use nom::{IResult, Parser};
use nom::branch::alt;
use nom::character::complete::char;
use nom::combinator::{all_consuming, map};
use nom::number::complete::double;
use nom::sequence::preceded;

use crate::core::error::{Error, ErrorKind, Result};

/// Immutable numeric range predicate over one field.
///
/// Parsed from argv triples `<field> <min> <max>`; bounds default to closed,
/// a `(` prefix makes a bound exclusive, and `-inf` / `+inf` open an end
/// entirely. `score (1 5` matches `1 < x <= 5`.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericFilter {
    pub field: String,
    pub min: f64,
    pub max: f64,
    pub inclusive_min: bool,
    pub inclusive_max: bool,
    pub min_neg_inf: bool,
    pub max_pos_inf: bool,
}

impl NumericFilter {
    pub fn new(field: impl Into<String>, min: f64, max: f64) -> Self {
        NumericFilter {
            field: field.into(),
            min,
            max,
            inclusive_min: true,
            inclusive_max: true,
            min_neg_inf: false,
            max_pos_inf: false,
        }
    }

    pub fn matches(&self, score: f64) -> bool {
        let match_min = self.min_neg_inf
            || if self.inclusive_min {
                score >= self.min
            } else {
                score > self.min
            };
        if !match_min {
            return false;
        }
        self.max_pos_inf
            || if self.inclusive_max {
                score <= self.max
            } else {
                score < self.max
            }
    }

    /// Parse `<field> <min> <max>`. Malformed bounds are a parse error.
    pub fn parse(argv: &[&str]) -> Result<NumericFilter> {
        if argv.len() != 3 {
            return Err(parse_error(&format!(
                "numeric filter takes 3 arguments, got {}",
                argv.len()
            )));
        }

        let mut filter = NumericFilter::new(argv[0], 0.0, 0.0);

        if argv[1] == "-inf" {
            filter.min_neg_inf = true;
        } else {
            let (min, inclusive) = parse_bound(argv[1])?;
            filter.min = min;
            filter.inclusive_min = inclusive;
        }

        if argv[2] == "+inf" {
            filter.max_pos_inf = true;
        } else {
            let (max, inclusive) = parse_bound(argv[2])?;
            filter.max = max;
            filter.inclusive_max = inclusive;
        }

        Ok(filter)
    }
}

fn parse_bound(input: &str) -> Result<(f64, bool)> {
    let exclusive = map(preceded(char('('), double), |v| (v, false));
    let inclusive = map(double, |v| (v, true));
    let parsed: IResult<&str, (f64, bool)> =
        all_consuming(alt((exclusive, inclusive))).parse(input);
    parsed
        .map(|(_, bound)| bound)
        .map_err(|_| parse_error(&format!("bad numeric bound '{}'", input)))
}

fn parse_error(context: &str) -> Error {
    Error::new(ErrorKind::Parse, context.to_string())
}
