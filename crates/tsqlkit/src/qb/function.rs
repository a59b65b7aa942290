//! Multi-operand functions and their UNION-based emulations.

use crate::condition::{Function, FunctionKind};
use crate::error::{TsqlError, TsqlResult};
use crate::qb::condition::build_operand;
use crate::qb::param::Params;
use crate::version::ServerVersion;

pub(crate) fn build_function(
    f: &Function,
    version: ServerVersion,
    params: &mut Params,
) -> TsqlResult<String> {
    if f.operands.is_empty() {
        return Err(TsqlError::invalid_argument(format!(
            "{:?} requires at least one operand",
            f.kind
        )));
    }

    let mut operands = Vec::with_capacity(f.operands.len());
    for operand in &f.operands {
        operands.push(build_operand(operand, version, params)?);
    }

    Ok(match f.kind {
        FunctionKind::Greatest | FunctionKind::Least => {
            let (native, aggregate) = if f.kind == FunctionKind::Greatest {
                ("GREATEST", "MAX")
            } else {
                ("LEAST", "MIN")
            };
            if operands.len() == 1 {
                operands.remove(0)
            } else if version.supports_greatest_least() {
                format!("{native}({})", operands.join(", "))
            } else {
                format!("(SELECT {aggregate}(value) FROM ({}) AS t)", value_union(&operands))
            }
        }
        FunctionKind::Longest | FunctionKind::Shortest => {
            let order = if f.kind == FunctionKind::Longest {
                "DESC"
            } else {
                "ASC"
            };
            format!(
                "(SELECT TOP 1 value FROM ({}) AS t ORDER BY LEN(value) {order})",
                value_union(&operands)
            )
        }
        FunctionKind::ArrayMerge => {
            let union = operands
                .iter()
                .map(|op| format!("SELECT value FROM OPENJSON({op})"))
                .collect::<Vec<_>>()
                .join(" UNION ");
            format!(
                "(SELECT '[' + STRING_AGG('\"' + STRING_ESCAPE(value, 'json') + '\"', ',') + ']' FROM ({union}) AS t)"
            )
        }
    })
}

fn value_union(operands: &[String]) -> String {
    operands
        .iter()
        .map(|op| format!("SELECT {op} AS value"))
        .collect::<Vec<_>>()
        .join(" UNION ")
}
