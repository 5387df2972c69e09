use crate::schema::Schema;
use crate::table::Table;

/// Split `data` so every returned table holds one value per schema column.
///
/// Columns are taken outermost first. A schema column the table does not
/// have is skipped. With an empty schema the result is `[data]`; an empty
/// table split on any column gives nothing. Every row lands in exactly one
/// partition.
pub fn datafilter(schema: &Schema, data: &Table) -> Vec<Table> {
    let mut result = Vec::new();
    split(schema.columns(), data.clone(), &mut result);
    result
}

fn split(levels: &[String], pool: Table, out: &mut Vec<Table>) {
    let Some((header, rest)) = levels.split_first() else {
        out.push(pool);
        return;
    };

    let Some(groups) = pool.group_by(header) else {
        split(rest, pool, out);
        return;
    };

    for group in groups {
        split(rest, group, out);
    }
}
