//! Expansion and precedence resolution for configuration rows keyed by
//! building category, building code and purpose.
//!
//! Key cells may hold the token `default`, a group alias (`residential`,
//! `non_residential`) or a `+`-separated list. Rows are exploded into one row
//! per concrete key, given a priority equal to the number of key columns that
//! are not `default`, and then resolved so that exactly one value remains per
//! key. At equal priority, the row that is more specific in the column order
//! category, code, purpose wins; any tie left over with differing values is an
//! [`AmbiguousDataError`].

use crate::core::building::{BuildingCategory, BuildingCode, BuildingCodes, EnergyPurpose};
use crate::errors::AmbiguousDataError;
use indexmap::IndexMap;
use itertools::Itertools;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use strum::IntoEnumIterator;

pub const DEFAULT_TOKEN: &str = "default";
pub const RESIDENTIAL_TOKEN: &str = "residential";
pub const NON_RESIDENTIAL_TOKEN: &str = "non_residential";
const LIST_SEPARATOR: char = '+';

/// The parsed content of one key cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Selector<T> {
    Default,
    Group(Vec<T>),
    Single(T),
}

impl<T: Clone + PartialEq> Selector<T> {
    /// Parse a key cell using `lookup` for single values and `alias` for named groups.
    pub fn parse(
        token: &str,
        lookup: impl Fn(&str) -> Option<T>,
        alias: impl Fn(&str) -> Option<Vec<T>>,
    ) -> Result<Self, String> {
        let token = token.trim();
        if token.eq_ignore_ascii_case(DEFAULT_TOKEN) {
            return Ok(Selector::Default);
        }
        if let Some(values) = alias(&token.to_ascii_lowercase()) {
            return Ok(Selector::Group(values));
        }
        if token.contains(LIST_SEPARATOR) {
            let values = token
                .split(LIST_SEPARATOR)
                .map(|part| lookup(part.trim()).ok_or_else(|| unknown(part.trim())))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Selector::Group(values));
        }
        lookup(token).map(Selector::Single).ok_or_else(|| unknown(token))
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Selector::Default)
    }

    /// 0 for `default`, 1 for a group, 2 for a single value.
    pub fn specificity(&self) -> u8 {
        match self {
            Selector::Default => 0,
            Selector::Group(_) => 1,
            Selector::Single(_) => 2,
        }
    }

    pub fn covers(&self, value: &T) -> bool {
        match self {
            Selector::Default => true,
            Selector::Group(values) => values.contains(value),
            Selector::Single(single) => single == value,
        }
    }
}

fn unknown(token: &str) -> String {
    format!("unknown key value '{token}'")
}

/// Selector for a `building_category` cell.
pub fn parse_category_selector(token: &str) -> Result<Selector<BuildingCategory>, String> {
    Selector::parse(
        token,
        |t| t.parse().ok(),
        |alias| match alias {
            RESIDENTIAL_TOKEN => Some(BuildingCategory::residential()),
            NON_RESIDENTIAL_TOKEN => Some(BuildingCategory::non_residential()),
            _ => None,
        },
    )
}

/// Selector for a `building_code` cell, checked against the known codes.
pub fn parse_code_selector(
    token: &str,
    codes: &BuildingCodes,
) -> Result<Selector<BuildingCode>, String> {
    Selector::parse(token, |t| codes.find(t).cloned(), |_| None)
}

/// Selector for a `purpose` cell.
pub fn parse_purpose_selector(token: &str) -> Result<Selector<EnergyPurpose>, String> {
    Selector::parse(token, |t| t.parse().ok(), |_| None)
}

/// Substitute a selector by every concrete value it stands for.
pub fn explode_column_alias<T: Clone + PartialEq>(selector: &Selector<T>, values: &[T]) -> Vec<T> {
    match selector {
        Selector::Default => values.to_vec(),
        Selector::Group(group) => values.iter().filter(|v| group.contains(v)).cloned().collect(),
        Selector::Single(single) => vec![single.clone()],
    }
}

/// The concrete values each token column can take in a run.
#[derive(Clone, Debug)]
pub struct Keyspace {
    pub categories: Vec<BuildingCategory>,
    pub codes: Vec<BuildingCode>,
    pub purposes: Vec<EnergyPurpose>,
}

impl Keyspace {
    pub fn new(codes: &BuildingCodes) -> Self {
        Self {
            categories: BuildingCategory::iter().collect(),
            codes: codes.codes().cloned().collect(),
            purposes: EnergyPurpose::iter().collect(),
        }
    }
}

/// A configuration row before expansion. Tables without a purpose column carry `purpose: None`.
#[derive(Clone, Debug, PartialEq)]
pub struct ScopedRow<K, V> {
    /// Source row number, used when reporting ambiguities.
    pub row: usize,
    pub category: Selector<BuildingCategory>,
    pub code: Selector<BuildingCode>,
    pub purpose: Option<Selector<EnergyPurpose>>,
    /// Additional key columns that take no tokens (condition, heating system, ...).
    pub extra: K,
    pub value: V,
}

impl<K: PartialEq, V> ScopedRow<K, V> {
    pub fn matches(&self, key: &ScopeKey<K>) -> bool {
        self.category.covers(&key.category)
            && self.code.covers(&key.code)
            && match (&self.purpose, &key.purpose) {
                (Some(selector), Some(purpose)) => selector.covers(purpose),
                (None, None) => true,
                _ => false,
            }
            && self.extra == key.extra
    }
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ScopeKey<K> {
    pub category: BuildingCategory,
    pub code: BuildingCode,
    pub purpose: Option<EnergyPurpose>,
    pub extra: K,
}

impl<K: Debug> Display for ScopeKey<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}", self.category, self.code)?;
        if let Some(purpose) = self.purpose {
            write!(f, ", {purpose}")?;
        }
        write!(f, ", {:?})", self.extra)
    }
}

/// Priority and per-column specificity of a row, used to order competing rows.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Precedence {
    pub priority: u8,
    pub specificity: [u8; 3],
}

/// A row exploded to a single concrete key.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpandedRow<K, V> {
    pub key: ScopeKey<K>,
    pub precedence: Precedence,
    pub row: usize,
    pub value: V,
}

/// Count of non-default token columns, with per-column specificity as tie-breaker.
pub fn add_priority<K, V>(row: &ScopedRow<K, V>) -> Precedence {
    let purpose_specificity = row.purpose.as_ref().map_or(0, Selector::specificity);
    let priority = [
        !row.category.is_default(),
        !row.code.is_default(),
        row.purpose.as_ref().is_some_and(|p| !p.is_default()),
    ]
    .into_iter()
    .filter(|non_default| *non_default)
    .count() as u8;

    Precedence {
        priority,
        specificity: [
            row.category.specificity(),
            row.code.specificity(),
            purpose_specificity,
        ],
    }
}

/// Explode category, code and purpose of every row into concrete keys.
pub fn explode_unique_columns<K: Clone, V: Clone>(
    rows: &[ScopedRow<K, V>],
    keyspace: &Keyspace,
) -> Vec<ExpandedRow<K, V>> {
    rows.iter()
        .flat_map(|row| {
            let precedence = add_priority(row);
            let categories = explode_column_alias(&row.category, &keyspace.categories);
            let codes = explode_column_alias(&row.code, &keyspace.codes);
            let purposes: Vec<Option<EnergyPurpose>> = match &row.purpose {
                Some(selector) => explode_column_alias(selector, &keyspace.purposes)
                    .into_iter()
                    .map(Some)
                    .collect(),
                None => vec![None],
            };

            categories
                .into_iter()
                .cartesian_product(codes)
                .cartesian_product(purposes)
                .map(move |((category, code), purpose)| ExpandedRow {
                    key: ScopeKey {
                        category,
                        code,
                        purpose,
                        extra: row.extra.clone(),
                    },
                    precedence,
                    row: row.row,
                    value: row.value.clone(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Rows of `rows` that apply to `key`, before any precedence is applied.
pub fn apply_filter<'a, K: PartialEq, V>(
    rows: &'a [ScopedRow<K, V>],
    key: &ScopeKey<K>,
) -> Vec<&'a ScopedRow<K, V>> {
    rows.iter().filter(|row| row.matches(key)).collect()
}

/// Fail when rows tied at the winning precedence carry different values.
pub fn check_conflicting_data<K: Debug, V: PartialEq>(
    table: &str,
    key: &ScopeKey<K>,
    tied: &[(usize, &V)],
) -> Result<(), AmbiguousDataError> {
    let Some((_, first)) = tied.first() else {
        return Ok(());
    };
    if tied.iter().all(|(_, value)| value == first) {
        return Ok(());
    }
    Err(AmbiguousDataError {
        table: table.to_string(),
        key: key.to_string(),
        rows: tied.iter().map(|(row, _)| *row).sorted().collect(),
    })
}

/// Pick the winning row among candidates for one key.
pub fn resolve_tied_priority<K: Debug, V: PartialEq>(
    table: &str,
    key: &ScopeKey<K>,
    candidates: &[(Precedence, usize, V)],
) -> Result<Option<usize>, AmbiguousDataError> {
    let Some(best) = candidates.iter().map(|(precedence, ..)| *precedence).max() else {
        return Ok(None);
    };
    let tied: Vec<(usize, &V)> = candidates
        .iter()
        .enumerate()
        .filter(|(_, (precedence, ..))| *precedence == best)
        .map(|(idx, (_, _, value))| (idx, value))
        .collect();
    check_conflicting_data(
        table,
        key,
        &tied
            .iter()
            .map(|(idx, value)| (candidates[*idx].1, *value))
            .collect::<Vec<_>>(),
    )?;
    Ok(tied.first().map(|(idx, _)| *idx))
}

/// Resolve a single key directly against unexpanded rows.
pub fn resolve_one<K: PartialEq + Debug, V: PartialEq + Clone>(
    table: &str,
    rows: &[ScopedRow<K, V>],
    key: &ScopeKey<K>,
) -> Result<Option<V>, AmbiguousDataError> {
    let candidates: Vec<(Precedence, usize, V)> = apply_filter(rows, key)
        .into_iter()
        .map(|row| (add_priority(row), row.row, row.value.clone()))
        .collect();
    Ok(resolve_tied_priority(table, key, &candidates)?.map(|idx| candidates[idx].2.clone()))
}

/// A configuration table resolved to exactly one value per concrete key.
#[derive(Clone, Debug)]
pub struct ResolvedTable<K: Eq + Hash, V> {
    name: String,
    values: IndexMap<ScopeKey<K>, V>,
}

impl<K, V> ResolvedTable<K, V>
where
    K: Clone + Debug + Eq + Hash,
    V: Clone + PartialEq,
{
    /// Expand every row and resolve precedence for every key.
    pub fn resolve(
        name: &str,
        rows: &[ScopedRow<K, V>],
        keyspace: &Keyspace,
    ) -> Result<Self, AmbiguousDataError> {
        let mut grouped: IndexMap<ScopeKey<K>, Vec<(Precedence, usize, V)>> = IndexMap::new();
        for expanded in explode_unique_columns(rows, keyspace) {
            grouped.entry(expanded.key).or_default().push((
                expanded.precedence,
                expanded.row,
                expanded.value,
            ));
        }

        let mut values = IndexMap::with_capacity(grouped.len());
        for (key, candidates) in grouped {
            if let Some(idx) = resolve_tied_priority(name, &key, &candidates)? {
                values.insert(key, candidates[idx].2.clone());
            }
        }

        Ok(Self {
            name: name.to_string(),
            values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &ScopeKey<K>) -> Option<&V> {
        self.values.get(key)
    }

    /// Look up a key, falling back to `neutral` (and logging the failed key) when no row covers it.
    pub fn get_or_neutral(&self, key: &ScopeKey<K>, neutral: V) -> V
    where
        V: Debug,
    {
        match self.values.get(key) {
            Some(value) => value.clone(),
            None => {
                tracing::error!(
                    table = self.name.as_str(),
                    key = %key,
                    "No row (not even a default) covers key; using neutral value {neutral:?}"
                );
                neutral
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ScopeKey<K>, &V)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::building::BuildingCodeParameters;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn codes() -> BuildingCodes {
        BuildingCodes::new(
            [("TEK07", 2010), ("TEK17", 2020), ("TEK21", 2025)].map(|(name, year)| {
                (
                    BuildingCode::new(name),
                    BuildingCodeParameters {
                        birth_year: year,
                        period_start_year: year - 3,
                        period_end_year: year + 4,
                    },
                )
            }),
        )
    }

    fn row(
        idx: usize,
        category: &str,
        code: &str,
        purpose: &str,
        value: f64,
        codes: &BuildingCodes,
    ) -> ScopedRow<(), f64> {
        ScopedRow {
            row: idx,
            category: parse_category_selector(category).unwrap(),
            code: parse_code_selector(code, codes).unwrap(),
            purpose: Some(parse_purpose_selector(purpose).unwrap()),
            extra: (),
            value,
        }
    }

    fn key(category: BuildingCategory, code: &str, purpose: EnergyPurpose) -> ScopeKey<()> {
        ScopeKey {
            category,
            code: BuildingCode::new(code),
            purpose: Some(purpose),
            extra: (),
        }
    }

    #[rstest]
    fn should_parse_tokens(codes: BuildingCodes) {
        assert_eq!(parse_category_selector("default"), Ok(Selector::Default));
        assert_eq!(
            parse_category_selector("residential"),
            Ok(Selector::Group(vec![
                BuildingCategory::House,
                BuildingCategory::ApartmentBlock
            ]))
        );
        assert_eq!(
            parse_category_selector("house+office"),
            Ok(Selector::Group(vec![
                BuildingCategory::House,
                BuildingCategory::Office
            ]))
        );
        assert_eq!(
            parse_code_selector("TEK17", &codes),
            Ok(Selector::Single(BuildingCode::new("TEK17")))
        );
        assert!(parse_code_selector("TEK99", &codes).is_err());
        assert!(parse_purpose_selector("heating+lighting").is_err());
    }

    #[rstest]
    fn should_explode_aliases_in_keyspace_order(codes: BuildingCodes) {
        let keyspace = Keyspace::new(&codes);
        let selector = parse_code_selector("TEK21+TEK07", &codes).unwrap();
        assert_eq!(
            explode_column_alias(&selector, &keyspace.codes),
            vec![BuildingCode::new("TEK07"), BuildingCode::new("TEK21")]
        );
        assert_eq!(
            explode_column_alias(&Selector::<BuildingCode>::Default, &keyspace.codes).len(),
            3
        );
    }

    #[rstest]
    fn should_count_non_default_columns_as_priority(codes: BuildingCodes) {
        assert_eq!(
            add_priority(&row(0, "default", "default", "default", 1., &codes)).priority,
            0
        );
        assert_eq!(
            add_priority(&row(0, "residential", "TEK07", "default", 1., &codes)),
            Precedence {
                priority: 2,
                specificity: [1, 2, 0]
            }
        );
    }

    #[rstest]
    fn should_resolve_specific_rows_over_defaults(codes: BuildingCodes) {
        let rows = vec![
            row(0, "default", "default", "default", 3.3, &codes),
            row(1, "default", "TEK17", "default", 3.2, &codes),
            row(2, "default", "TEK21", "cooling", 3.1, &codes),
            row(3, "apartment_block", "TEK07", "cooling", 2.1, &codes),
        ];
        let table = ResolvedTable::resolve("test", &rows, &Keyspace::new(&codes)).unwrap();

        assert_eq!(table.len(), 13 * 3 * 6);
        assert_eq!(
            table.get(&key(
                BuildingCategory::ApartmentBlock,
                "TEK07",
                EnergyPurpose::Cooling
            )),
            Some(&2.1)
        );
        assert_eq!(
            table.get(&key(
                BuildingCategory::Culture,
                "TEK07",
                EnergyPurpose::Lighting
            )),
            Some(&3.3)
        );
        assert_eq!(
            table.get(&key(
                BuildingCategory::ApartmentBlock,
                "TEK21",
                EnergyPurpose::Cooling
            )),
            Some(&3.1)
        );
        assert_eq!(
            table.get(&key(BuildingCategory::House, "TEK17", EnergyPurpose::Lighting)),
            Some(&3.2)
        );
    }

    #[rstest]
    fn should_prefer_category_over_code_at_equal_priority(codes: BuildingCodes) {
        let rows = vec![
            row(0, "default", "TEK07", "cooling", 1.0, &codes),
            row(1, "apartment_block", "default", "cooling", 2.0, &codes),
        ];
        let table = ResolvedTable::resolve("test", &rows, &Keyspace::new(&codes)).unwrap();
        assert_eq!(
            table.get(&key(
                BuildingCategory::ApartmentBlock,
                "TEK07",
                EnergyPurpose::Cooling
            )),
            Some(&2.0)
        );
        assert_eq!(
            table.get(&key(BuildingCategory::House, "TEK07", EnergyPurpose::Cooling)),
            Some(&1.0)
        );
    }

    #[rstest]
    fn should_prefer_single_category_over_group(codes: BuildingCodes) {
        let rows = vec![
            row(0, "residential", "default", "heating_rv", 1.5, &codes),
            row(1, "house", "default", "heating_rv", 1.2, &codes),
        ];
        let table = ResolvedTable::resolve("test", &rows, &Keyspace::new(&codes)).unwrap();
        assert_eq!(
            table.get(&key(BuildingCategory::House, "TEK17", EnergyPurpose::HeatingRv)),
            Some(&1.2)
        );
        assert_eq!(
            table.get(&key(
                BuildingCategory::ApartmentBlock,
                "TEK17",
                EnergyPurpose::HeatingRv
            )),
            Some(&1.5)
        );
        assert_eq!(
            table.get(&key(BuildingCategory::Office, "TEK17", EnergyPurpose::HeatingRv)),
            None
        );
    }

    #[rstest]
    fn should_fail_on_conflicting_rows_at_same_precedence(codes: BuildingCodes) {
        let rows = vec![
            row(0, "default", "default", "default", 1.0, &codes),
            row(4, "house", "TEK07", "default", 1.0, &codes),
            row(7, "house", "TEK07", "default", 0.9, &codes),
        ];
        let error = ResolvedTable::resolve("behaviour", &rows, &Keyspace::new(&codes)).unwrap_err();
        assert_eq!(error.table, "behaviour");
        assert_eq!(error.rows, vec![4, 7]);
    }

    #[rstest]
    fn should_collapse_duplicate_rows_with_equal_values(codes: BuildingCodes) {
        let rows = vec![
            row(0, "house", "TEK07", "lighting", 0.5, &codes),
            row(1, "house", "TEK07", "lighting", 0.5, &codes),
        ];
        let table = ResolvedTable::resolve("test", &rows, &Keyspace::new(&codes)).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[rstest]
    fn should_resolve_one_key_without_full_expansion(codes: BuildingCodes) {
        let rows = vec![
            row(0, "default", "default", "default", 3.3, &codes),
            row(1, "non_residential", "default", "heating_rv", 1.1, &codes),
        ];
        assert_eq!(
            resolve_one(
                "test",
                &rows,
                &key(BuildingCategory::School, "TEK17", EnergyPurpose::HeatingRv)
            ),
            Ok(Some(1.1))
        );
        assert_eq!(
            resolve_one(
                "test",
                &rows,
                &key(BuildingCategory::House, "TEK17", EnergyPurpose::HeatingRv)
            ),
            Ok(Some(3.3))
        );
        let school = key(BuildingCategory::School, "TEK17", EnergyPurpose::HeatingRv);
        assert_eq!(apply_filter(&rows, &school).len(), 2);
    }

    #[rstest]
    fn should_fall_back_to_neutral_value_for_uncovered_keys(codes: BuildingCodes) {
        let rows = vec![row(0, "house", "default", "default", 0.7, &codes)];
        let table = ResolvedTable::resolve("test", &rows, &Keyspace::new(&codes)).unwrap();
        let office = key(BuildingCategory::Office, "TEK07", EnergyPurpose::Lighting);
        assert_eq!(table.get_or_neutral(&office, 1.0), 1.0);
    }
}
