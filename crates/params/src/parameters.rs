use crate::combinations::{Combinations, Selector};
use crate::declaration::Declaration;
use crate::error::{ParamsError, Result};
use crate::sorting::SortingSet;
use crate::table::{Table, Table2D, TypeMap};
use crate::types::{ParameterType, RawValue, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// All information about the parameters of a part, and the operations on
/// them.
///
/// A parameter set is built once from a [`Declaration`] and never changes
/// afterwards; [`ParameterSet::union`] returns a new set.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    types: TypeMap,
    literal: BTreeMap<String, Value>,
    free: Vec<String>,
    tables: Vec<Table>,
    tables2d: Vec<Table2D>,
    parameters: BTreeSet<String>,
    description: BTreeMap<String, String>,
    choices: BTreeMap<String, Vec<String>>,
    defaults: BTreeMap<String, Value>,
    declared: BTreeSet<String>,
    common: Option<Vec<Vec<Selector>>>,
    sortings: Arc<SortingSet>,
}

impl ParameterSet {
    /// Build a parameter set with the default sorting strategies
    pub fn new(declaration: &Declaration) -> Result<Self> {
        Self::with_sortings(declaration, Arc::new(SortingSet::default()))
    }

    /// Check the schema of a raw mapping and build a parameter set from it
    pub fn from_value(value: RawValue) -> Result<Self> {
        Self::new(&Declaration::from_value(value)?)
    }

    /// Build a parameter set, ordering choices with the given strategies
    pub fn with_sortings(declaration: &Declaration, sortings: Arc<SortingSet>) -> Result<Self> {
        let types = declaration
            .types
            .iter()
            .map(|(name, ty)| Ok((name.clone(), ty.parse::<ParameterType>()?)))
            .collect::<Result<TypeMap>>()?;

        let literal = declaration
            .literal
            .iter()
            .map(|(name, raw)| {
                let ty = types
                    .get(name)
                    .ok_or_else(|| ParamsError::MissingType(name.clone()))?;
                Ok((name.clone(), ty.convert(name, raw)?))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        let free = declaration.free.clone();

        for table in &declaration.tables2d {
            table.check()?;
        }

        let mut parameters: BTreeSet<String> = literal.keys().cloned().collect();
        parameters.extend(free.iter().cloned());
        for table in &declaration.tables {
            parameters.extend(table.parameters().map(String::from));
        }
        for table in &declaration.tables2d {
            parameters.extend(table.parameters().map(String::from));
        }

        if let Some(name) = types.keys().find(|name| !parameters.contains(*name)) {
            return Err(ParamsError::UnknownParameter(name.clone()));
        }
        if let Some(name) = parameters.iter().find(|name| !types.contains_key(*name)) {
            return Err(ParamsError::MissingType(name.clone()));
        }
        if let Some(name) = declaration
            .description
            .keys()
            .find(|name| !parameters.contains(*name))
        {
            return Err(ParamsError::UnknownParameter(name.clone()));
        }

        let tables = declaration
            .tables
            .iter()
            .map(|decl| {
                let table = decl.normalize_and_check_types(&types)?;
                require_table_index(&types, table.index())?;
                Ok(table)
            })
            .collect::<Result<Vec<_>>>()?;
        let tables2d = declaration
            .tables2d
            .iter()
            .map(|decl| {
                let table = decl.normalize_and_check_types(&types)?;
                require_table_index(&types, table.rowindex())?;
                require_table_index(&types, table.colindex())?;
                Ok(table)
            })
            .collect::<Result<Vec<_>>>()?;

        let choices = compute_choices(&free, &types, &tables, &tables2d, &sortings)?;
        let defaults = compute_defaults(&free, &types, &choices, &declaration.defaults)?;

        let common = match &declaration.common {
            Some(entries) => Some(
                entries
                    .iter()
                    .map(|entry| parse_common_entry(&free, &types, entry))
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => default_common(&free, &types),
        };

        log::debug!(
            "Built parameter set: {} parameters, {} free, {} tables, {} 2D tables",
            parameters.len(),
            free.len(),
            tables.len(),
            tables2d.len()
        );

        Ok(Self {
            types,
            literal,
            free,
            tables,
            tables2d,
            parameters,
            description: declaration.description.clone(),
            choices,
            defaults,
            declared: declaration.defaults.keys().cloned().collect(),
            common,
            sortings,
        })
    }

    /// Every parameter mentioned anywhere in the declaration
    #[must_use]
    pub fn parameters(&self) -> &BTreeSet<String> {
        &self.parameters
    }

    /// Free parameters in declaration order
    #[must_use]
    pub fn free(&self) -> &[String] {
        &self.free
    }

    #[must_use]
    pub fn literal(&self) -> &BTreeMap<String, Value> {
        &self.literal
    }

    #[must_use]
    pub fn types(&self) -> &TypeMap {
        &self.types
    }

    #[must_use]
    pub fn type_of(&self, parameter: &str) -> Option<ParameterType> {
        self.types.get(parameter).copied()
    }

    #[must_use]
    pub fn description(&self, parameter: &str) -> Option<&str> {
        self.description.get(parameter).map(String::as_str)
    }

    #[must_use]
    pub fn descriptions(&self) -> &BTreeMap<String, String> {
        &self.description
    }

    /// Sorted choices of a free Table Index parameter
    #[must_use]
    pub fn choices(&self, parameter: &str) -> Option<&[String]> {
        self.choices.get(parameter).map(Vec::as_slice)
    }

    #[must_use]
    pub fn all_choices(&self) -> &BTreeMap<String, Vec<String>> {
        &self.choices
    }

    #[must_use]
    pub fn defaults(&self) -> &BTreeMap<String, Value> {
        &self.defaults
    }

    #[must_use]
    pub fn default_of(&self, parameter: &str) -> Option<&Value> {
        self.defaults.get(parameter)
    }

    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    #[must_use]
    pub fn tables2d(&self) -> &[Table2D] {
        &self.tables2d
    }

    /// Common combinations, or `None` when there is no finite set of them
    #[must_use]
    pub fn combinations(&self) -> Option<Combinations<'_>> {
        self.common
            .as_deref()
            .map(|entries| Combinations::new(self, entries))
    }

    /// Like [`combinations`](Self::combinations), naming the parameter that
    /// prevents enumeration
    pub fn try_combinations(&self) -> Result<Combinations<'_>> {
        self.combinations().ok_or_else(|| {
            let parameter = self
                .free
                .iter()
                .find(|name| !self.type_of(name).is_some_and(ParameterType::is_discrete))
                .cloned()
                .unwrap_or_default();
            ParamsError::NotEnumerable(parameter)
        })
    }

    /// Number of common combinations, without enumerating them
    #[must_use]
    pub fn combination_count(&self) -> Option<usize> {
        let entries = self.common.as_ref()?;
        Some(
            entries
                .iter()
                .map(|entry| {
                    entry
                        .iter()
                        .enumerate()
                        .map(|(idx, selector)| match selector {
                            Selector::All => self.free_domain_len(idx),
                            Selector::Values(values) => values.len(),
                        })
                        .fold(1usize, usize::saturating_mul)
                })
                .fold(0usize, usize::saturating_add),
        )
    }

    /// Every value of the free parameter at `idx`, if its domain is finite
    pub(crate) fn free_domain(&self, idx: usize) -> Vec<Value> {
        let Some(name) = self.free.get(idx) else {
            return Vec::new();
        };
        match self.type_of(name) {
            Some(ParameterType::TableIndex) => self
                .choices
                .get(name)
                .map(|choices| choices.iter().cloned().map(Value::Str).collect())
                .unwrap_or_default(),
            Some(ty) => ty.enumeration().map(<[Value]>::to_vec).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    fn free_domain_len(&self, idx: usize) -> usize {
        let Some(name) = self.free.get(idx) else {
            return 0;
        };
        match self.type_of(name) {
            Some(ParameterType::TableIndex) => self.choices.get(name).map_or(0, Vec::len),
            Some(ty) => ty.enumeration().map_or(0, <[Value]>::len),
            None => 0,
        }
    }

    /// Pair a combination with the names of the free parameters
    #[must_use]
    pub fn free_values(&self, combination: &[Value]) -> BTreeMap<String, Value> {
        self.free
            .iter()
            .cloned()
            .zip(combination.iter().cloned())
            .collect()
    }

    /// Convert a raw value supplied for a free parameter
    pub fn parse_free_value(&self, parameter: &str, raw: &RawValue) -> Result<Value> {
        if !self.free.iter().any(|name| name == parameter) {
            return Err(ParamsError::NotFree(parameter.to_string()));
        }
        let ty = self
            .type_of(parameter)
            .ok_or_else(|| ParamsError::MissingType(parameter.to_string()))?;
        ty.convert(parameter, raw)
    }

    /// Derive the values of all parameters from the values of the free ones
    pub fn collect(&self, free: &BTreeMap<String, Value>) -> Result<BTreeMap<String, Value>> {
        let mut res = self.literal.clone();
        res.extend(free.iter().map(|(name, value)| (name.clone(), value.clone())));

        for table in &self.tables {
            let key = lookup_key(&res, table.index())?;
            res.extend(table.get_values(&key)?);
        }
        for table in &self.tables2d {
            let row = lookup_key(&res, table.rowindex())?;
            let col = lookup_key(&res, table.colindex())?;
            res.extend(table.get_value(&row, &col)?);
        }

        if let Some(missing) = self.parameters.iter().find(|name| !res.contains_key(*name)) {
            return Err(ParamsError::Incomplete(missing.clone()));
        }
        Ok(res)
    }

    /// [`collect`](Self::collect) for one common combination
    pub fn collect_combination(&self, combination: &[Value]) -> Result<BTreeMap<String, Value>> {
        self.collect(&self.free_values(combination))
    }

    /// [`collect`](Self::collect) with every free parameter at its default
    pub fn collect_defaults(&self) -> Result<BTreeMap<String, Value>> {
        self.collect(&self.defaults)
    }

    /// Merge with another parameter set into a new one.
    ///
    /// Literals of `other` win on collision. Types, declared defaults and
    /// descriptions of shared parameters must agree, choices are intersected.
    /// Undeclared defaults are derived again from the merged choices.
    pub fn union(&self, other: &ParameterSet) -> Result<ParameterSet> {
        let types = merge_strict(&self.types, &other.types, |name, left, right| {
            ParamsError::incompatible_type(name, left, right)
        })?;
        let description = merge_strict(
            &self.description,
            &other.description,
            |name, left, right| ParamsError::IncompatibleDescription {
                parameter: name.to_string(),
                left: left.clone(),
                right: right.clone(),
            },
        )?;

        let mut literal = self.literal.clone();
        literal.extend(other.literal.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut free = self.free.clone();
        free.extend(other.free.iter().cloned());
        let distinct: BTreeSet<&String> = free.iter().collect();
        if distinct.len() != free.len() {
            log::warn!("Union has duplicate free parameters: {free:?}");
        }

        let mut parameters = self.parameters.clone();
        parameters.extend(other.parameters.iter().cloned());

        let mut merged: BTreeMap<String, BTreeSet<String>> = self
            .choices
            .iter()
            .map(|(name, values)| (name.clone(), values.iter().cloned().collect()))
            .collect();
        for (name, values) in &other.choices {
            let theirs: BTreeSet<String> = values.iter().cloned().collect();
            let narrowed = match merged.get(name) {
                Some(ours) => ours & &theirs,
                None => theirs,
            };
            merged.insert(name.clone(), narrowed);
        }
        let choices = merged
            .into_iter()
            .map(|(name, set)| {
                if set.is_empty() {
                    return Err(ParamsError::EmptyChoices(name));
                }
                let sorted = self.sortings.sort(&set);
                Ok((name, sorted))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        let mut defaults = merge_strict(
            &self.declared_defaults(),
            &other.declared_defaults(),
            |name, left, right| ParamsError::IncompatibleDefault {
                parameter: name.to_string(),
                left: left.to_string(),
                right: right.to_string(),
            },
        )?;
        for (name, value) in &defaults {
            if let Some(choices) = choices.get(name) {
                check_choice(name, value, choices)?;
            }
        }
        let declared: BTreeSet<String> = defaults.keys().cloned().collect();
        for name in &free {
            if defaults.contains_key(name) {
                continue;
            }
            let value = match choices.get(name).and_then(|choices| choices.first()) {
                Some(first) => Value::Str(first.clone()),
                None => types
                    .get(name)
                    .map_or(Value::Null, |ty| ty.default_value()),
            };
            defaults.insert(name.clone(), value);
        }

        let common = default_common(&free, &types);

        log::debug!(
            "Union of parameter sets: {} parameters, {} free",
            parameters.len(),
            free.len()
        );

        Ok(ParameterSet {
            types,
            literal,
            free,
            tables: [self.tables.as_slice(), other.tables.as_slice()].concat(),
            tables2d: [self.tables2d.as_slice(), other.tables2d.as_slice()].concat(),
            parameters,
            description,
            choices,
            defaults,
            declared,
            common,
            sortings: Arc::clone(&self.sortings),
        })
    }
}

impl ParameterSet {
    /// Defaults given in the declaration, without the derived ones
    fn declared_defaults(&self) -> BTreeMap<String, Value> {
        self.defaults
            .iter()
            .filter(|(name, _)| self.declared.contains(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

fn require_table_index(types: &TypeMap, parameter: &str) -> Result<()> {
    match types.get(parameter) {
        Some(ParameterType::TableIndex) => Ok(()),
        Some(other) => Err(ParamsError::TableIndexType {
            parameter: parameter.to_string(),
            found: other.to_string(),
        }),
        None => Err(ParamsError::MissingType(parameter.to_string())),
    }
}

fn narrow(acc: Option<BTreeSet<String>>, keys: BTreeSet<String>) -> Option<BTreeSet<String>> {
    Some(match acc {
        None => keys,
        Some(acc) => &acc & &keys,
    })
}

fn compute_choices(
    free: &[String],
    types: &TypeMap,
    tables: &[Table],
    tables2d: &[Table2D],
    sortings: &SortingSet,
) -> Result<BTreeMap<String, Vec<String>>> {
    let mut choices = BTreeMap::new();
    for name in free {
        if types.get(name) != Some(&ParameterType::TableIndex) {
            continue;
        }

        let mut set = None;
        for table in tables.iter().filter(|t| t.index() == name) {
            set = narrow(set, table.keys().map(String::from).collect());
        }
        for table in tables2d {
            if table.rowindex() == name {
                set = narrow(set, table.keys().map(String::from).collect());
            } else if table.colindex() == name {
                set = narrow(set, table.columns().iter().cloned().collect());
            }
        }

        let set = set.ok_or_else(|| ParamsError::UnindexedParameter(name.clone()))?;
        if set.is_empty() {
            return Err(ParamsError::EmptyChoices(name.clone()));
        }
        let sorted = sortings.sort(&set);
        log::debug!("Choices for {name}: {sorted:?}");
        choices.insert(name.clone(), sorted);
    }
    Ok(choices)
}

fn check_choice(parameter: &str, value: &Value, choices: &[String]) -> Result<()> {
    let key = value.as_key();
    if choices.iter().any(|choice| *choice == key) {
        Ok(())
    } else {
        Err(ParamsError::InvalidTableIndex {
            parameter: parameter.to_string(),
            value: key.into_owned(),
        })
    }
}

fn compute_defaults(
    free: &[String],
    types: &TypeMap,
    choices: &BTreeMap<String, Vec<String>>,
    explicit: &BTreeMap<String, RawValue>,
) -> Result<BTreeMap<String, Value>> {
    if let Some(name) = explicit.keys().find(|name| !free.contains(*name)) {
        return Err(ParamsError::NonFreeDefault(name.clone()));
    }

    let mut defaults = BTreeMap::new();
    for name in free {
        let ty = types
            .get(name)
            .copied()
            .ok_or_else(|| ParamsError::MissingType(name.clone()))?;
        let table_choices = choices.get(name);
        let value = match (explicit.get(name), table_choices) {
            (Some(raw), Some(table_choices)) => {
                let value = ty.convert(name, raw)?;
                check_choice(name, &value, table_choices)?;
                value
            }
            (Some(raw), None) => ty.convert(name, raw)?,
            (None, Some(table_choices)) => table_choices
                .first()
                .cloned()
                .map_or_else(|| ty.default_value(), Value::Str),
            (None, None) => ty.default_value(),
        };
        defaults.insert(name.clone(), value);
    }
    Ok(defaults)
}

fn parse_common_entry(
    free: &[String],
    types: &TypeMap,
    entry: &[RawValue],
) -> Result<Vec<Selector>> {
    if entry.len() != free.len() {
        return Err(ParamsError::CommonArity {
            expected: free.len(),
            found: entry.len(),
        });
    }
    free.iter()
        .zip(entry)
        .map(|(name, raw)| {
            let ty = types
                .get(name)
                .copied()
                .ok_or_else(|| ParamsError::MissingType(name.clone()))?;
            Selector::parse(name, ty, raw)
        })
        .collect()
}

/// Full cross product over the free parameters, if all of them are discrete
fn default_common(free: &[String], types: &TypeMap) -> Option<Vec<Vec<Selector>>> {
    free.iter()
        .all(|name| types.get(name).is_some_and(|ty| ty.is_discrete()))
        .then(|| vec![vec![Selector::All; free.len()]])
}

fn lookup_key(values: &BTreeMap<String, Value>, parameter: &str) -> Result<String> {
    values
        .get(parameter)
        .map(|value| value.as_key().into_owned())
        .ok_or_else(|| ParamsError::Incomplete(parameter.to_string()))
}

fn merge_strict<V, F>(
    left: &BTreeMap<String, V>,
    right: &BTreeMap<String, V>,
    conflict: F,
) -> Result<BTreeMap<String, V>>
where
    V: Clone + PartialEq,
    F: Fn(&str, &V, &V) -> ParamsError,
{
    let mut merged = left.clone();
    for (name, value) in right {
        match merged.get(name) {
            Some(existing) if existing != value => return Err(conflict(name, existing, value)),
            Some(_) => {}
            None => {
                merged.insert(name.clone(), value.clone());
            }
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bolt() -> ParameterSet {
        ParameterSet::from_value(json!({
            "types": {
                "key": "Table Index",
                "d1": "Length (mm)",
                "k": "Length (mm)",
                "l": "Length (mm)",
                "thread": "String"
            },
            "literal": {"thread": "metric"},
            "free": ["key", "l"],
            "defaults": {"l": 20},
            "common": [[":", [10, 20]]],
            "tables": {
                "index": "key",
                "columns": ["d1", "k"],
                "data": {"M10": [10, 6.4], "M3": [3, 2], "M4": [4, 2.8]}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_build() {
        let set = bolt();
        assert_eq!(set.parameters().len(), 5);
        assert_eq!(set.choices("key").unwrap(), ["M3", "M4", "M10"]);
        assert_eq!(set.default_of("l"), Some(&Value::Number(20.0)));
        assert_eq!(set.default_of("key"), Some(&Value::from("M3")));
        assert_eq!(set.literal()["thread"], Value::from("metric"));
    }

    #[test]
    fn test_explicit_common_expansion() {
        let set = bolt();
        let combinations: Vec<_> = set.combinations().unwrap().collect();
        assert_eq!(set.combination_count(), Some(6));
        assert_eq!(combinations.len(), 6);
        assert_eq!(
            combinations[0],
            vec![Value::from("M3"), Value::Number(10.0)]
        );
        assert_eq!(
            combinations[5],
            vec![Value::from("M10"), Value::Number(20.0)]
        );
    }

    #[test]
    fn test_collect_with_table() {
        let set = bolt();
        let values = set.collect_defaults().unwrap();
        assert_eq!(values["d1"], Value::Number(3.0));
        assert_eq!(values["k"], Value::Number(2.0));
        assert_eq!(values["l"], Value::Number(20.0));
        assert_eq!(values.len(), 5);
    }

    #[test]
    fn test_collect_unknown_key() {
        let set = bolt();
        let err = set
            .collect_combination(&[Value::from("M5"), Value::Number(10.0)])
            .unwrap_err();
        assert!(matches!(err, ParamsError::MissingRow { key, .. } if key == "M5"));
    }

    #[test]
    fn test_parse_free_value() {
        let set = bolt();
        assert_eq!(
            set.parse_free_value("l", &json!("25")).unwrap(),
            Value::Number(25.0)
        );
        assert_eq!(
            set.parse_free_value("d1", &json!("25")),
            Err(ParamsError::NotFree("d1".into()))
        );
    }

    #[test]
    fn test_merge_strict_reports_both_sides() {
        let left = BTreeMap::from([("a".to_string(), 1)]);
        let right = BTreeMap::from([("a".to_string(), 2)]);
        let err = merge_strict(&left, &right, |name, l, r| {
            ParamsError::incompatible_type(name, l, r)
        })
        .unwrap_err();
        assert_eq!(err, ParamsError::incompatible_type("a", 1, 2));
    }
}
