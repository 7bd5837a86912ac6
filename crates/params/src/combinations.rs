use crate::error::{ParamsError, Result};
use crate::parameters::ParameterSet;
use crate::types::{ParameterType, RawValue, Value};

/// Values of the free parameters for one catalog entry, in declaration order
pub type Combination = Vec<Value>;

const WILDCARD: &str = ":";

/// Which values of one free parameter a common entry covers
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Every value of the parameter's finite domain
    All,
    /// An explicit list of values
    Values(Vec<Value>),
}

impl Selector {
    /// Parse a raw selector, converting listed values to the parameter's type
    pub fn parse(parameter: &str, ty: ParameterType, raw: &RawValue) -> Result<Self> {
        match raw {
            RawValue::String(s) if s == WILDCARD => {
                if !ty.is_discrete() {
                    return Err(ParamsError::ContinuousWildcard(parameter.to_string()));
                }
                Ok(Self::All)
            }
            RawValue::Array(items) => items
                .iter()
                .map(|item| ty.convert(parameter, item))
                .collect::<Result<Vec<_>>>()
                .map(Self::Values),
            other => Err(ParamsError::InvalidSelector {
                parameter: parameter.to_string(),
                selector: other.to_string(),
            }),
        }
    }
}

/// Lazy enumeration of common combinations.
///
/// Every entry is expanded as a cartesian product with the first free
/// parameter varying slowest. Only the domains of the entry being expanded
/// are held in memory.
#[derive(Debug, Clone)]
pub struct Combinations<'a> {
    set: &'a ParameterSet,
    entries: &'a [Vec<Selector>],
    next_entry: usize,
    current: Option<Odometer>,
}

impl<'a> Combinations<'a> {
    pub(crate) fn new(set: &'a ParameterSet, entries: &'a [Vec<Selector>]) -> Self {
        Self {
            set,
            entries,
            next_entry: 0,
            current: None,
        }
    }

    fn domains(&self, entry: &[Selector]) -> Vec<Vec<Value>> {
        entry
            .iter()
            .enumerate()
            .map(|(idx, selector)| match selector {
                Selector::All => self.set.free_domain(idx),
                Selector::Values(values) => values.clone(),
            })
            .collect()
    }
}

impl Iterator for Combinations<'_> {
    type Item = Combination;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(odometer) = self.current.as_mut() {
                let combination = odometer.current();
                if !odometer.advance() {
                    self.current = None;
                }
                return Some(combination);
            }

            let entries = self.entries;
            let entry = entries.get(self.next_entry)?;
            self.next_entry += 1;

            let domains = self.domains(entry);
            if domains.iter().any(Vec::is_empty) {
                continue;
            }
            self.current = Some(Odometer {
                positions: vec![0; domains.len()],
                domains,
            });
        }
    }
}

#[derive(Debug, Clone)]
struct Odometer {
    domains: Vec<Vec<Value>>,
    positions: Vec<usize>,
}

impl Odometer {
    fn current(&self) -> Combination {
        self.positions
            .iter()
            .zip(&self.domains)
            .map(|(&pos, domain)| domain[pos].clone())
            .collect()
    }

    /// Step to the next position; false once every position was visited
    fn advance(&mut self) -> bool {
        for idx in (0..self.positions.len()).rev() {
            self.positions[idx] += 1;
            if self.positions[idx] < self.domains[idx].len() {
                return true;
            }
            self.positions[idx] = 0;
        }
        false
    }
}
