//! Parser of the `relations|predicates|selections` query lines, e.g.
//! `3 0 1|0.2=1.0&0.1=2.0&0.2>3499|1.2 0.1`.

use std::str::FromStr;

use joiner::catalog::RelationId;
use joiner::error::{JoinerError, JoinerResult};
use joiner::query::{ColumnRef, Comparison, FilterPredicate, JoinPredicate, QueryInfo};

enum Operand {
    Column(ColumnRef),
    Constant(u64),
}

pub fn parse_query(line: &str) -> JoinerResult<QueryInfo> {
    let sections = line.trim().split('|').collect::<Vec<_>>();
    let [relations, predicates, selections] = sections[..] else {
        return Err(invalid(format!(
            "expected 3 '|' separated sections, found {} in '{}'",
            sections.len(),
            line
        )));
    };

    let relation_ids = relations
        .split_whitespace()
        .map(|id| {
            id.parse::<RelationId>()
                .map_err(|e| invalid(format!("bad relation id '{}': {}", id, e)))
        })
        .collect::<JoinerResult<Vec<_>>>()?;

    let mut joins = vec![];
    let mut filters = vec![];
    for predicate in predicates.split('&').map(str::trim).filter(|p| !p.is_empty()) {
        let pos = predicate
            .find(|c: char| matches!(c, '=' | '<' | '>'))
            .ok_or_else(|| invalid(format!("predicate '{}' has no comparison", predicate)))?;
        let comparison = Comparison::from_str(&predicate[pos..pos + 1])
            .map_err(|e| invalid(format!("bad comparison in '{}': {}", predicate, e)))?;
        let left = parse_operand(&relation_ids, &predicate[..pos])?;
        let right = parse_operand(&relation_ids, &predicate[pos + 1..])?;

        match (left, right) {
            (Operand::Column(left), Operand::Column(right)) => {
                joins.push(JoinPredicate::new(left, right, comparison))
            }
            (Operand::Column(column), Operand::Constant(constant)) => {
                filters.push(FilterPredicate::new(column, comparison, constant))
            }
            (Operand::Constant(constant), Operand::Column(column)) => {
                filters.push(FilterPredicate::new(column, comparison.mirror(), constant))
            }
            (Operand::Constant(_), Operand::Constant(_)) => {
                return Err(invalid(format!(
                    "predicate '{}' compares two constants",
                    predicate
                )))
            }
        }
    }

    let selections = selections
        .split_whitespace()
        .map(|column| parse_column(&relation_ids, column))
        .collect::<JoinerResult<Vec<_>>>()?;

    QueryInfo::new(relation_ids, joins, filters, selections)
}

fn parse_operand(relation_ids: &[RelationId], text: &str) -> JoinerResult<Operand> {
    let text = text.trim();
    if text.contains('.') {
        Ok(Operand::Column(parse_column(relation_ids, text)?))
    } else {
        text.parse()
            .map(Operand::Constant)
            .map_err(|e| invalid(format!("bad constant '{}': {}", text, e)))
    }
}

fn parse_column(relation_ids: &[RelationId], text: &str) -> JoinerResult<ColumnRef> {
    let (binding, column) = text
        .split_once('.')
        .ok_or_else(|| invalid(format!("bad column '{}'", text)))?;
    let binding = binding
        .trim()
        .parse::<usize>()
        .map_err(|e| invalid(format!("bad binding in '{}': {}", text, e)))?;
    let column_id = column
        .trim()
        .parse::<usize>()
        .map_err(|e| invalid(format!("bad column id in '{}': {}", text, e)))?;
    let relation_id = relation_ids
        .get(binding)
        .ok_or_else(|| invalid(format!("column '{}' uses unknown binding {}", text, binding)))?;
    Ok(ColumnRef::new(binding, *relation_id, column_id))
}

fn invalid(message: String) -> JoinerError {
    JoinerError::InvalidQuery(message)
}

#[cfg(test)]
mod tests {
    use joiner::query::{ColumnRef, Comparison, FilterPredicate, JoinPredicate};

    use crate::parser::parse_query;

    #[test]
    fn test_parse_query() {
        let query = parse_query("3 0 1|0.2=1.0&0.1=2.0&0.2>3499|1.2 0.1").unwrap();

        assert_eq!(&[3, 0, 1], query.relation_ids());
        assert_eq!(
            &[
                JoinPredicate::equi(ColumnRef::new(0, 3, 2), ColumnRef::new(1, 0, 0)),
                JoinPredicate::equi(ColumnRef::new(0, 3, 1), ColumnRef::new(2, 1, 0)),
            ],
            query.predicates()
        );
        assert_eq!(
            &[FilterPredicate::new(
                ColumnRef::new(0, 3, 2),
                Comparison::Greater,
                3499
            )],
            query.filters()
        );
        assert_eq!(
            &[ColumnRef::new(1, 0, 2), ColumnRef::new(0, 3, 1)],
            query.selections()
        );
    }

    #[test]
    fn test_constant_on_left_is_mirrored() {
        let query = parse_query("0|5<0.1|0.0").unwrap();

        assert_eq!(
            &[FilterPredicate::new(
                ColumnRef::new(0, 0, 1),
                Comparison::Greater,
                5
            )],
            query.filters()
        );
    }

    #[test]
    fn test_display_round_trip() {
        let line = "3 0 1|0.2=1.0&0.1=2.0&0.2=4531|1.2 0.1";

        assert_eq!(line, parse_query(line).unwrap().to_string());
    }

    #[test]
    fn test_malformed_queries() {
        for line in [
            "",
            "0 1|0.0=1.0",
            "x|0.0=0.1|0.0",
            "0|0.0~1|0.0",
            "0|1=2|0.0",
            "0|0.0=1.0|0.0",
            "0||",
            "0|0.0=abc|0.0",
        ] {
            assert!(parse_query(line).is_err(), "'{}' should be rejected", line);
        }
    }
}
