//! The task specification itself and its parser.

use crate::error::{Result, TaskSpecError};
use crate::range::{Bound, DoubleRange, IntRange, Range, SpaceSpec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound on the dimensions one space may declare, repeats included.
pub const MAX_DIMENSIONS: usize = 1 << 16;

/// A parsed RL-Glue 3.0 task specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    version: String,
    problem_type: String,
    discount_factor: f64,
    observations: SpaceSpec,
    actions: SpaceSpec,
    rewards: DoubleRange,
    extra: Option<String>,
}

impl TaskSpec {
    /// Builds a spec for a task with one discrete observation and one discrete
    /// action dimension, `[0, num_states)` and `[0, num_actions)`.
    ///
    /// Both counts must be at least 1, and the discount must lie in `[0, 1]`.
    pub fn discrete(
        num_states: usize,
        num_actions: usize,
        discount_factor: f64,
        rewards: DoubleRange,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&discount_factor) {
            return Err(TaskSpecError::InvalidDiscount(discount_factor));
        }
        Ok(Self {
            version: "RL-Glue-3.0".to_string(),
            problem_type: "episodic".to_string(),
            discount_factor,
            observations: SpaceSpec {
                ints: vec![IntRange::ints(0, last_index(num_states, "states")?)],
                ..Default::default()
            },
            actions: SpaceSpec {
                ints: vec![IntRange::ints(0, last_index(num_actions, "actions")?)],
                ..Default::default()
            },
            rewards,
            extra: None,
        })
    }

    /// Parses a task spec string.
    pub fn parse(input: &str) -> Result<Self> {
        Parser::new(input).parse()
    }

    /// Attaches free-form trailing text.
    pub fn with_extra(mut self, extra: &str) -> Self {
        self.extra = Some(extra.to_string());
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `episodic`, `continuing`, or whatever the environment reported.
    pub fn problem_type(&self) -> &str {
        &self.problem_type
    }

    pub fn discount_factor(&self) -> f64 {
        self.discount_factor
    }

    pub fn observations(&self) -> &SpaceSpec {
        &self.observations
    }

    pub fn actions(&self) -> &SpaceSpec {
        &self.actions
    }

    pub fn reward_range(&self) -> &DoubleRange {
        &self.rewards
    }

    /// Free text following the `EXTRA` keyword.
    pub fn extra(&self) -> Option<&str> {
        self.extra.as_deref()
    }
}

impl FromStr for TaskSpec {
    type Err = TaskSpecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VERSION {} PROBLEMTYPE {} DISCOUNTFACTOR {} OBSERVATIONS{} ACTIONS{} REWARDS {}",
            self.version,
            self.problem_type,
            self.discount_factor,
            self.observations,
            self.actions,
            self.rewards
        )?;
        if let Some(extra) = &self.extra {
            write!(f, " EXTRA {}", extra)?;
        }
        Ok(())
    }
}

struct Token<'a> {
    text: &'a str,
    /// Byte offset just past the token.
    end: usize,
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            tokens: tokenize(input),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<TaskSpec> {
        self.expect_keyword("VERSION")?;
        let version = self.next_text("a version string")?.to_string();
        self.expect_keyword("PROBLEMTYPE")?;
        let problem_type = self.next_text("a problem type")?.to_string();
        self.expect_keyword("DISCOUNTFACTOR")?;
        let discount_factor = parse_f64(self.next_text("a discount factor")?)?;
        if !(0.0..=1.0).contains(&discount_factor) {
            return Err(TaskSpecError::InvalidDiscount(discount_factor));
        }
        self.expect_keyword("OBSERVATIONS")?;
        let observations = self.parse_space()?;
        self.expect_keyword("ACTIONS")?;
        let actions = self.parse_space()?;
        self.expect_keyword("REWARDS")?;
        let rewards = match self.parse_group(parse_f64)? {
            (1, range) => range,
            _ => {
                return Err(TaskSpecError::InvalidRange(
                    "REWARDS takes a single (min max) range".to_string(),
                ))
            }
        };

        let extra = match self.tokens.get(self.pos) {
            None => None,
            Some(token) if token.text == "EXTRA" => {
                let rest = self.input[token.end..].trim();
                self.pos = self.tokens.len();
                Some(rest.to_string())
            }
            Some(token) => {
                return Err(TaskSpecError::UnexpectedToken {
                    expected: "EXTRA or end of input",
                    found: token.text.to_string(),
                })
            }
        };

        Ok(TaskSpec {
            version,
            problem_type,
            discount_factor,
            observations,
            actions,
            rewards,
            extra,
        })
    }

    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).map(|t| t.text)
    }

    fn next_text(&mut self, expected: &'static str) -> Result<&'a str> {
        let text = self
            .peek()
            .ok_or(TaskSpecError::UnexpectedEnd { expected })?;
        self.pos += 1;
        Ok(text)
    }

    fn expect_keyword(&mut self, keyword: &'static str) -> Result<()> {
        match self.peek() {
            Some(text) if text == keyword => {
                self.pos += 1;
                Ok(())
            }
            Some(text) => Err(TaskSpecError::UnexpectedToken {
                expected: keyword,
                found: text.to_string(),
            }),
            None => Err(TaskSpecError::MissingSection(keyword)),
        }
    }

    fn parse_space(&mut self) -> Result<SpaceSpec> {
        let mut space = SpaceSpec::default();
        loop {
            match self.peek() {
                Some("INTS") => {
                    self.pos += 1;
                    space.ints.extend(self.parse_groups(parse_i64)?);
                }
                Some("DOUBLES") => {
                    self.pos += 1;
                    space.doubles.extend(self.parse_groups(parse_f64)?);
                }
                Some("CHARCOUNT") => {
                    self.pos += 1;
                    let text = self.next_text("a character count")?;
                    space.char_count = text
                        .parse()
                        .map_err(|_| TaskSpecError::InvalidNumber(text.to_string()))?;
                }
                _ => return Ok(space),
            }
        }
    }

    /// Parses one or more consecutive range groups, expanding repeats.
    fn parse_groups<T: Copy + PartialOrd>(
        &mut self,
        parse: fn(&str) -> Result<T>,
    ) -> Result<Vec<Range<T>>> {
        let mut ranges = Vec::new();
        while self.peek() == Some("(") || ranges.is_empty() {
            let (repeat, range) = self.parse_group(parse)?;
            let total = ranges.len().saturating_add(repeat);
            if total > MAX_DIMENSIONS {
                return Err(TaskSpecError::InvalidRange(format!(
                    "{} dimensions exceeds the limit of {}",
                    total, MAX_DIMENSIONS
                )));
            }
            ranges.try_reserve(repeat).map_err(|_| {
                TaskSpecError::InvalidRange(format!("cannot allocate {} dimensions", total))
            })?;
            ranges.extend(std::iter::repeat(range).take(repeat));
        }
        Ok(ranges)
    }

    /// Parses `(min max)` or `(repeat min max)`.
    fn parse_group<T: Copy + PartialOrd>(
        &mut self,
        parse: fn(&str) -> Result<T>,
    ) -> Result<(usize, Range<T>)> {
        let open = self.next_text("`(`")?;
        if open != "(" {
            return Err(TaskSpecError::UnexpectedToken {
                expected: "`(`",
                found: open.to_string(),
            });
        }
        let mut fields = Vec::with_capacity(3);
        loop {
            let text = self.next_text("`)`")?;
            if text == ")" {
                break;
            }
            fields.push(text);
        }

        let (repeat, min, max) = match fields.as_slice() {
            [min, max] => (1, *min, *max),
            [repeat, min, max] => {
                let repeat: usize = repeat
                    .parse()
                    .map_err(|_| TaskSpecError::InvalidNumber(repeat.to_string()))?;
                (repeat, *min, *max)
            }
            other => {
                return Err(TaskSpecError::InvalidRange(format!(
                    "expected 2 or 3 fields, found {}",
                    other.len()
                )))
            }
        };
        if repeat == 0 {
            return Err(TaskSpecError::InvalidRange(
                "repeat count must be positive".to_string(),
            ));
        }

        let range = Range::new(parse_bound(min, parse)?, parse_bound(max, parse)?);
        if let (Some(lo), Some(hi)) = (range.min.value(), range.max.value()) {
            if lo > hi {
                return Err(TaskSpecError::InvalidRange(format!(
                    "min {} exceeds max {}",
                    min, max
                )));
            }
        }
        Ok((repeat, range))
    }
}

/// Largest index of a `count`-sized discrete dimension.
fn last_index(count: usize, what: &str) -> Result<i64> {
    match i64::try_from(count) {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(TaskSpecError::InvalidRange(format!(
            "number of {} must be between 1 and {}, got {}",
            what,
            i64::MAX,
            count
        ))),
    }
}

/// Splits on whitespace, treating parentheses as standalone tokens.
fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in input.char_indices() {
        if c.is_whitespace() || c == '(' || c == ')' {
            if let Some(s) = start.take() {
                tokens.push(Token {
                    text: &input[s..i],
                    end: i,
                });
            }
            if c == '(' || c == ')' {
                tokens.push(Token {
                    text: &input[i..i + 1],
                    end: i + 1,
                });
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(Token {
            text: &input[s..],
            end: input.len(),
        });
    }
    tokens
}

fn parse_bound<T>(text: &str, parse: fn(&str) -> Result<T>) -> Result<Bound<T>> {
    Ok(match text {
        "NEGINF" => Bound::NegInf,
        "POSINF" => Bound::PosInf,
        "UNSPEC" => Bound::Unspecified,
        _ => Bound::Value(parse(text)?),
    })
}

fn parse_i64(text: &str) -> Result<i64> {
    text.parse()
        .map_err(|_| TaskSpecError::InvalidNumber(text.to_string()))
}

fn parse_f64(text: &str) -> Result<f64> {
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(TaskSpecError::InvalidNumber(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: &str = "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.9 \
                        OBSERVATIONS INTS (0 19) ACTIONS INTS (0 3) REWARDS (-1.0 1.0) \
                        EXTRA grid world by the lab";

    #[test]
    fn test_parse_discrete_task() {
        let spec = TaskSpec::parse(GRID).unwrap();
        assert_eq!(spec.version(), "RL-Glue-3.0");
        assert_eq!(spec.problem_type(), "episodic");
        assert_eq!(spec.discount_factor(), 0.9);
        assert_eq!(spec.observations().discrete_dims(), 1);
        assert_eq!(spec.observations().int_range(0), Some(&IntRange::ints(0, 19)));
        assert_eq!(spec.actions().int_range(0), Some(&IntRange::ints(0, 3)));
        assert_eq!(spec.reward_range(), &DoubleRange::doubles(-1.0, 1.0));
        assert_eq!(spec.extra(), Some("grid world by the lab"));
    }

    #[test]
    fn test_parse_repeated_and_mixed_dimensions() {
        let text = "VERSION RL-Glue-3.0 PROBLEMTYPE continuing DISCOUNTFACTOR 1 \
                    OBSERVATIONS INTS (3 0 1) (0 4) DOUBLES (-1.2 0.6) CHARCOUNT 2 \
                    ACTIONS INTS (0 2) REWARDS (UNSPEC 0)";
        let spec = TaskSpec::parse(text).unwrap();
        assert_eq!(spec.observations().discrete_dims(), 4);
        assert_eq!(spec.observations().continuous_dims(), 1);
        assert_eq!(spec.observations().char_count, 2);
        assert_eq!(spec.reward_range().min, Bound::Unspecified);
        assert_eq!(spec.reward_range().max, Bound::Value(0.0));
        assert!(spec.extra().is_none());
    }

    #[test]
    fn test_parse_special_bounds() {
        let text = "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.5 \
                    OBSERVATIONS INTS (0 POSINF) ACTIONS INTS (NEGINF 1) REWARDS (0 1)";
        let spec = TaskSpec::parse(text).unwrap();
        assert_eq!(spec.observations().ints[0].max, Bound::PosInf);
        assert_eq!(spec.actions().ints[0].min, Bound::NegInf);
    }

    #[test]
    fn test_parse_tight_parentheses() {
        let text = "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.5 \
                    OBSERVATIONS INTS(0 2)ACTIONS INTS(0 1) REWARDS(0 1)";
        let spec = TaskSpec::parse(text).unwrap();
        assert_eq!(spec.observations().int_range(0), Some(&IntRange::ints(0, 2)));
    }

    #[test]
    fn test_display_reparses_to_equal_spec() {
        let spec = TaskSpec::parse(GRID).unwrap();
        let again = TaskSpec::parse(&spec.to_string()).unwrap();
        assert_eq!(spec, again);

        let built = TaskSpec::discrete(5, 2, 0.95, DoubleRange::doubles(0.0, 1.0)).unwrap();
        assert_eq!(TaskSpec::parse(&built.to_string()).unwrap(), built);

        let single = TaskSpec::discrete(1, 1, 0.0, DoubleRange::doubles(0.0, 0.0)).unwrap();
        assert_eq!(TaskSpec::parse(&single.to_string()).unwrap(), single);
    }

    #[test]
    fn test_discrete_rejects_empty_spaces() {
        let rewards = DoubleRange::doubles(0.0, 1.0);
        assert!(matches!(
            TaskSpec::discrete(0, 2, 0.9, rewards).unwrap_err(),
            TaskSpecError::InvalidRange(_)
        ));
        assert!(matches!(
            TaskSpec::discrete(3, 0, 0.9, rewards).unwrap_err(),
            TaskSpecError::InvalidRange(_)
        ));
        assert_eq!(
            TaskSpec::discrete(3, 2, 1.5, rewards).unwrap_err(),
            TaskSpecError::InvalidDiscount(1.5)
        );
    }

    #[test]
    fn test_huge_repeat_count_is_rejected() {
        let text = "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.5 \
                    OBSERVATIONS INTS (18446744073709551615 0 1) ACTIONS INTS (0 1) REWARDS (0 1)";
        assert!(matches!(
            TaskSpec::parse(text).unwrap_err(),
            TaskSpecError::InvalidRange(_)
        ));

        let text = "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.5 \
                    OBSERVATIONS INTS (1000000000 0 1) ACTIONS INTS (0 1) REWARDS (0 1)";
        assert!(matches!(
            TaskSpec::parse(text).unwrap_err(),
            TaskSpecError::InvalidRange(_)
        ));
    }

    #[test]
    fn test_repeats_add_up_against_the_limit() {
        let half = MAX_DIMENSIONS / 2;
        let at_limit = format!(
            "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.5 \
             OBSERVATIONS INTS ({} 0 1) ({} 0 1) ACTIONS INTS (0 1) REWARDS (0 1)",
            half, half
        );
        let spec = TaskSpec::parse(&at_limit).unwrap();
        assert_eq!(spec.observations().discrete_dims(), MAX_DIMENSIONS);

        let over = format!(
            "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.5 \
             OBSERVATIONS INTS ({} 0 1) ({} 0 1) (0 1) ACTIONS INTS (0 1) REWARDS (0 1)",
            half, half
        );
        assert!(matches!(
            TaskSpec::parse(&over).unwrap_err(),
            TaskSpecError::InvalidRange(_)
        ));
    }

    #[test]
    fn test_serde_json_round_trip() {
        let text = "VERSION RL-Glue-3.0 PROBLEMTYPE continuing DISCOUNTFACTOR 0.95 \
                    OBSERVATIONS INTS (2 0 POSINF) DOUBLES (NEGINF 0.5) CHARCOUNT 3 \
                    ACTIONS INTS (0 3) REWARDS (UNSPEC 1) EXTRA tagged run";
        let spec = TaskSpec::parse(text).unwrap();

        let json = serde_json::to_string(&spec).unwrap();
        let restored: TaskSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, spec);
        assert_eq!(restored.to_string(), spec.to_string());
    }

    #[test]
    fn test_missing_section() {
        let err = TaskSpec::parse("VERSION RL-Glue-3.0 PROBLEMTYPE episodic").unwrap_err();
        assert_eq!(err, TaskSpecError::MissingSection("DISCOUNTFACTOR"));
    }

    #[test]
    fn test_unexpected_token() {
        let err = TaskSpec::parse("PROBLEMTYPE episodic").unwrap_err();
        assert!(matches!(
            err,
            TaskSpecError::UnexpectedToken {
                expected: "VERSION",
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_discount() {
        let text = "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 1.5 \
                    OBSERVATIONS INTS (0 1) ACTIONS INTS (0 1) REWARDS (0 1)";
        assert_eq!(
            TaskSpec::parse(text).unwrap_err(),
            TaskSpecError::InvalidDiscount(1.5)
        );
    }

    #[test]
    fn test_invalid_range() {
        let text = "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.5 \
                    OBSERVATIONS INTS (4 1) ACTIONS INTS (0 1) REWARDS (0 1)";
        assert!(matches!(
            TaskSpec::parse(text).unwrap_err(),
            TaskSpecError::InvalidRange(_)
        ));

        let text = "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.5 \
                    OBSERVATIONS INTS (0 1 2 3) ACTIONS INTS (0 1) REWARDS (0 1)";
        assert!(matches!(
            TaskSpec::parse(text).unwrap_err(),
            TaskSpecError::InvalidRange(_)
        ));
    }

    #[test]
    fn test_invalid_number() {
        let text = "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.5 \
                    OBSERVATIONS INTS (0 ten) ACTIONS INTS (0 1) REWARDS (0 1)";
        assert_eq!(
            TaskSpec::parse(text).unwrap_err(),
            TaskSpecError::InvalidNumber("ten".to_string())
        );
    }

    #[test]
    fn test_unexpected_end_inside_range() {
        let text = "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.5 \
                    OBSERVATIONS INTS (0 1";
        assert!(matches!(
            TaskSpec::parse(text).unwrap_err(),
            TaskSpecError::UnexpectedEnd { .. }
        ));
    }

    #[test]
    fn test_trailing_garbage() {
        let text = "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.5 \
                    OBSERVATIONS INTS (0 1) ACTIONS INTS (0 1) REWARDS (0 1) oops";
        assert!(matches!(
            TaskSpec::parse(text).unwrap_err(),
            TaskSpecError::UnexpectedToken { .. }
        ));
    }

    #[test]
    fn test_from_str() {
        let spec: TaskSpec = GRID.parse().unwrap();
        assert_eq!(spec.actions().discrete_dims(), 1);
    }
}
