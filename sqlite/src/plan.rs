//! Classifying tables into create, drop, and migrate sets.

use std::collections::HashSet;

use serde::Serialize;

/// What an upgrade will do to each table.
///
/// The three lists are disjoint. `to_migrate` and `to_create` follow the
/// declared table order; `to_drop` follows the live order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationPlan {
    /// Tables present both live and declared; rebuilt with data carried over.
    pub to_migrate: Vec<String>,
    /// Live tables the schema no longer declares.
    pub to_drop: Vec<String>,
    /// Declared tables missing from the database.
    pub to_create: Vec<String>,
}

impl MigrationPlan {
    /// Total number of tables the plan touches.
    pub fn table_count(&self) -> usize {
        self.to_migrate.len() + self.to_drop.len() + self.to_create.len()
    }
}

/// Diffs the live table set against the declared table names.
///
/// Matching is by exact, case-sensitive name equality.
///
/// # Examples
///
/// ```
/// use tableschema_sqlite::plan;
///
/// let plan = plan(&["TestTable", "Legacy"], &["TestTable", "NewTable1"]);
/// assert_eq!(plan.to_migrate, vec!["TestTable"]);
/// assert_eq!(plan.to_drop, vec!["Legacy"]);
/// assert_eq!(plan.to_create, vec!["NewTable1"]);
/// ```
pub fn plan<L, D>(live: &[L], declared: &[D]) -> MigrationPlan
where
    L: AsRef<str>,
    D: AsRef<str>,
{
    let live: Vec<&str> = live.iter().map(|name| name.as_ref()).collect();
    let declared: Vec<&str> = declared.iter().map(|name| name.as_ref()).collect();
    let live_set: HashSet<&str> = live.iter().copied().collect();
    let declared_set: HashSet<&str> = declared.iter().copied().collect();

    let mut plan = MigrationPlan::default();
    for name in declared {
        if live_set.contains(name) {
            plan.to_migrate.push(name.to_string());
        } else {
            plan.to_create.push(name.to_string());
        }
    }
    plan.to_drop = live
        .into_iter()
        .filter(|name| !declared_set.contains(name))
        .map(str::to_string)
        .collect();
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_partitions_tables() {
        let live = ["NewTable2", "Old", "TestTable"];
        let declared = ["TestTable", "NewTable1", "NewTable2"];
        let plan = plan(&live, &declared);
        assert_eq!(plan.to_migrate, vec!["TestTable", "NewTable2"]);
        assert_eq!(plan.to_drop, vec!["Old"]);
        assert_eq!(plan.to_create, vec!["NewTable1"]);
        assert_eq!(plan.table_count(), 4);
    }

    #[test]
    fn test_plan_against_empty_database() {
        let live: [&str; 0] = [];
        let plan = plan(&live, &["a", "b"]);
        assert!(plan.to_migrate.is_empty());
        assert!(plan.to_drop.is_empty());
        assert_eq!(plan.to_create, vec!["a", "b"]);
    }

    #[test]
    fn test_plan_is_case_sensitive() {
        let plan = plan(&["testtable"], &["TestTable"]);
        assert!(plan.to_migrate.is_empty());
        assert_eq!(plan.to_drop, vec!["testtable"]);
        assert_eq!(plan.to_create, vec!["TestTable"]);
    }

    #[test]
    fn test_every_name_in_exactly_one_set() {
        let live = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let declared = ["c", "d", "a"];
        let plan = plan(&live, &declared);

        let mut all: Vec<&String> = plan
            .to_migrate
            .iter()
            .chain(&plan.to_drop)
            .chain(&plan.to_create)
            .collect();
        all.sort();
        assert_eq!(all, vec!["a", "b", "c", "d"]);
    }
}
