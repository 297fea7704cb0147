//! Plan explanation
//!
//! Renders a plan as a stable indented text tree (for humans and for
//! golden tests) and as a structured JSON document (for tooling). The text
//! layout is part of the public contract; changes break downstream parsing.

use super::{Operator, Plan};
use crate::types::Value;
use serde_json::{json, Value as Json};

/// Human-readable explanation of a plan.
pub fn explain_text(plan: &Plan) -> String {
    let mut out = String::new();
    out.push_str(&format!("Plan #{} for '{}'\n", plan.id, plan.type_name));
    out.push_str(&format!(
        "  est. cost: {:.2} (index reads: {:.0}, record fetches: {:.0}, post-filter rows: {:.0}{})\n",
        plan.total_cost,
        plan.cost.index_reads,
        plan.cost.record_fetches,
        plan.cost.post_filter_rows,
        if plan.cost.requires_sort { ", sort" } else { "" },
    ));
    out.push_str(&format!("  est. rows: {:.0}\n", plan.estimated_rows));
    out.push_str(&format!(
        "  used indexes: {}\n",
        if plan.used_indexes.is_empty() {
            "none".to_string()
        } else {
            plan.used_indexes.join(", ")
        }
    ));
    let fields: Vec<&str> = plan.used_fields.iter().map(String::as_str).collect();
    out.push_str(&format!(
        "  used fields: {}\n",
        if fields.is_empty() {
            "none".to_string()
        } else {
            fields.join(", ")
        }
    ));
    out.push_str(&format!(
        "  ordering satisfied: {}\n",
        plan.ordering_satisfied
    ));
    match &plan.post_filter {
        Some(p) => out.push_str(&format!("  post-filter: {}\n", p.structural_key())),
        None => out.push_str("  post-filter: none\n"),
    }
    for warning in &plan.warnings {
        out.push_str(&format!("  warning: {warning}\n"));
    }
    write_operator(&plan.root, 0, &mut out);
    out
}

fn write_operator(op: &Operator, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str("-> ");
    out.push_str(&operator_line(op));
    out.push('\n');
    for child in op.children() {
        write_operator(child, depth + 1, out);
    }
}

fn render_values(values: &[Value]) -> String {
    let parts: Vec<String> = values.iter().map(Value::render).collect();
    format!("({})", parts.join(","))
}

fn render_satisfied(satisfied: &[String]) -> String {
    format!("[{}]", satisfied.join("; "))
}

fn operator_line(op: &Operator) -> String {
    match op {
        Operator::TableScan {
            type_name,
            filter,
            limit,
        } => {
            let mut line = format!("TableScan [{type_name}]");
            if let Some(f) = filter {
                line.push_str(&format!(" filter: {}", f.structural_key()));
            }
            if let Some(n) = limit {
                line.push_str(&format!(" limit: {n}"));
            }
            line
        }
        Operator::IndexScan {
            index,
            bounds,
            reverse,
            satisfied,
            estimated_entries,
            limit,
        } => {
            let mut line = format!(
                "IndexScan [{index}] bounds: {}, reverse: {reverse}, est. entries: {estimated_entries}, satisfies: {}",
                bounds.render(),
                render_satisfied(satisfied),
            );
            if let Some(n) = limit {
                line.push_str(&format!(", limit: {n}"));
            }
            line
        }
        Operator::IndexSeek {
            index,
            key,
            satisfied,
            estimated_entries,
        } => format!(
            "IndexSeek [{index}] key: {}, est. entries: {estimated_entries}, satisfies: {}",
            render_values(key),
            render_satisfied(satisfied),
        ),
        Operator::IndexOnlyScan {
            index,
            bounds,
            reverse,
            satisfied,
            projected_fields,
            estimated_entries,
            limit,
        } => {
            let mut line = format!(
                "IndexOnlyScan [{index}] bounds: {}, reverse: {reverse}, est. entries: {estimated_entries}, projects: [{}], satisfies: {}",
                bounds.render(),
                projected_fields.join(", "),
                render_satisfied(satisfied),
            );
            if let Some(n) = limit {
                line.push_str(&format!(", limit: {n}"));
            }
            line
        }
        Operator::SkipScan {
            index,
            prefix_columns,
            prefix_limit,
            suffix_bounds,
            satisfied,
            estimated_entries,
        } => format!(
            "SkipScan [{index}] prefix columns: {prefix_columns} (max {prefix_limit} values), suffix bounds: {}, est. entries: {estimated_entries}, satisfies: {}",
            suffix_bounds.render(),
            render_satisfied(satisfied),
        ),
        Operator::FullTextScan {
            index,
            terms,
            match_mode,
            satisfied,
            estimated_results,
        } => format!(
            "FullTextScan [{index}] terms: [{}], mode: {match_mode}, est. results: {estimated_results}, satisfies: {}",
            terms.join(", "),
            render_satisfied(satisfied),
        ),
        Operator::VectorSearch {
            index,
            k,
            metric,
            ef_search,
            satisfied,
        } => {
            let mut line = format!(
                "VectorSearch [{index}] k: {k}, metric: {}",
                metric.name()
            );
            if let Some(ef) = ef_search {
                line.push_str(&format!(", ef_search: {ef}"));
            }
            line.push_str(&format!(", satisfies: {}", render_satisfied(satisfied)));
            line
        }
        Operator::SpatialScan {
            index,
            satisfied,
            estimated_entries,
            ..
        } => format!(
            "SpatialScan [{index}] est. entries: {estimated_entries}, satisfies: {}",
            render_satisfied(satisfied),
        ),
        Operator::Union {
            children,
            deduplicate,
        } => format!(
            "Union ({} children, deduplicate: {deduplicate})",
            children.len()
        ),
        Operator::Intersection { children } => {
            format!("Intersection ({} children)", children.len())
        }
        Operator::Filter {
            predicate,
            selectivity,
            ..
        } => format!(
            "Filter predicate: {}, selectivity: {selectivity:.3}",
            predicate.structural_key()
        ),
        Operator::Sort { descriptors, .. } => {
            let keys: Vec<String> = descriptors
                .iter()
                .map(|d| {
                    format!(
                        "{} {}",
                        d.field,
                        if d.direction.is_descending() { "desc" } else { "asc" }
                    )
                })
                .collect();
            format!("Sort by: [{}]", keys.join(", "))
        }
        Operator::Limit { limit, offset, .. } => format!(
            "Limit limit: {}, offset: {}",
            limit.map_or("none".to_string(), |n| n.to_string()),
            offset.map_or("none".to_string(), |n| n.to_string()),
        ),
        Operator::Project { fields, .. } => format!("Project fields: [{}]", fields.join(", ")),
        Operator::InUnion {
            index,
            field,
            values,
            satisfied,
            estimated_entries,
        } => format!(
            "InUnion [{index}] field: {field}, values: {}, est. entries: {estimated_entries}, satisfies: {}",
            render_values(values),
            render_satisfied(satisfied),
        ),
        Operator::InJoin {
            index,
            field,
            values,
            satisfied,
            estimated_entries,
        } => format!(
            "InJoin [{index}] field: {field}, values: {}, est. entries: {estimated_entries}, satisfies: {}",
            render_values(values),
            render_satisfied(satisfied),
        ),
    }
}

/// Structured explanation document.
pub fn explain_json(plan: &Plan) -> Json {
    json!({
        "planId": plan.id,
        "typeName": plan.type_name,
        "estimatedCost": plan.total_cost,
        "estimatedRows": plan.estimated_rows,
        "costBreakdown": {
            "indexReads": plan.cost.index_reads,
            "recordFetches": plan.cost.record_fetches,
            "postFilterRows": plan.cost.post_filter_rows,
            "requiresSort": plan.cost.requires_sort,
            "additional": plan.cost.additional,
        },
        "usedIndexes": plan.used_indexes,
        "usedFields": plan.used_fields.iter().collect::<Vec<_>>(),
        "orderingSatisfied": plan.ordering_satisfied,
        "postFilter": plan.post_filter.as_ref().map(|p| p.structural_key()),
        "warnings": plan.warnings,
        "operatorTree": operator_json(&plan.root),
    })
}

fn operator_json(op: &Operator) -> Json {
    let mut object = serde_json::Map::new();
    object.insert("operator".to_string(), json!(op.name()));

    if let Some(index) = op.index_name() {
        object.insert("index".to_string(), json!(index));
    }
    if !op.satisfied().is_empty() {
        object.insert("satisfies".to_string(), json!(op.satisfied()));
    }

    match op {
        Operator::TableScan { type_name, filter, limit } => {
            object.insert("typeName".to_string(), json!(type_name));
            if let Some(f) = filter {
                object.insert("filter".to_string(), json!(f.structural_key()));
            }
            if let Some(n) = limit {
                object.insert("limit".to_string(), json!(n));
            }
        }
        Operator::IndexScan { bounds, reverse, estimated_entries, limit, .. } => {
            object.insert("bounds".to_string(), json!(bounds.render()));
            object.insert("reverse".to_string(), json!(reverse));
            object.insert("estimatedEntries".to_string(), json!(estimated_entries));
            if let Some(n) = limit {
                object.insert("limit".to_string(), json!(n));
            }
        }
        Operator::IndexSeek { key, estimated_entries, .. } => {
            object.insert("key".to_string(), json!(render_values(key)));
            object.insert("estimatedEntries".to_string(), json!(estimated_entries));
        }
        Operator::IndexOnlyScan {
            bounds,
            reverse,
            projected_fields,
            estimated_entries,
            limit,
            ..
        } => {
            object.insert("bounds".to_string(), json!(bounds.render()));
            object.insert("reverse".to_string(), json!(reverse));
            object.insert("projectedFields".to_string(), json!(projected_fields));
            object.insert("estimatedEntries".to_string(), json!(estimated_entries));
            if let Some(n) = limit {
                object.insert("limit".to_string(), json!(n));
            }
        }
        Operator::SkipScan {
            prefix_columns,
            prefix_limit,
            suffix_bounds,
            estimated_entries,
            ..
        } => {
            object.insert("prefixColumns".to_string(), json!(prefix_columns));
            object.insert("prefixLimit".to_string(), json!(prefix_limit));
            object.insert("suffixBounds".to_string(), json!(suffix_bounds.render()));
            object.insert("estimatedEntries".to_string(), json!(estimated_entries));
        }
        Operator::FullTextScan { terms, match_mode, estimated_results, .. } => {
            object.insert("terms".to_string(), json!(terms));
            object.insert("matchMode".to_string(), json!(match_mode));
            object.insert("estimatedResults".to_string(), json!(estimated_results));
        }
        Operator::VectorSearch { k, metric, ef_search, .. } => {
            object.insert("k".to_string(), json!(k));
            object.insert("metric".to_string(), json!(metric.name()));
            if let Some(ef) = ef_search {
                object.insert("efSearch".to_string(), json!(ef));
            }
        }
        Operator::SpatialScan { estimated_entries, .. } => {
            object.insert("estimatedEntries".to_string(), json!(estimated_entries));
        }
        Operator::Union { deduplicate, .. } => {
            object.insert("deduplicate".to_string(), json!(deduplicate));
        }
        Operator::Filter { predicate, selectivity, .. } => {
            object.insert("predicate".to_string(), json!(predicate.structural_key()));
            object.insert("selectivity".to_string(), json!(selectivity));
        }
        Operator::Sort { descriptors, .. } => {
            let keys: Vec<Json> = descriptors
                .iter()
                .map(|d| {
                    json!({
                        "field": d.field,
                        "descending": d.direction.is_descending(),
                    })
                })
                .collect();
            object.insert("sortKeys".to_string(), json!(keys));
        }
        Operator::Limit { limit, offset, .. } => {
            if let Some(n) = limit {
                object.insert("limit".to_string(), json!(n));
            }
            if let Some(n) = offset {
                object.insert("offset".to_string(), json!(n));
            }
        }
        Operator::Project { fields, .. } => {
            object.insert("fields".to_string(), json!(fields));
        }
        Operator::InUnion { field, values, estimated_entries, .. }
        | Operator::InJoin { field, values, estimated_entries, .. } => {
            object.insert("field".to_string(), json!(field));
            object.insert("values".to_string(), json!(render_values(values)));
            object.insert("estimatedEntries".to_string(), json!(estimated_entries));
        }
        _ => {}
    }

    let children: Vec<Json> = op.children().into_iter().map(operator_json).collect();
    if !children.is_empty() {
        object.insert("children".to_string(), json!(children));
    }
    Json::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{PlanCost, ScanBounds};
    use std::collections::BTreeSet;

    fn sample_plan() -> Plan {
        let scan = Operator::IndexScan {
            index: "user_region".into(),
            bounds: ScanBounds {
                start: vec![Value::Text("US".into())],
                end: vec![Value::Text("US".into())],
                start_inclusive: true,
                end_inclusive: true,
            },
            reverse: false,
            satisfied: vec!["region = \"US\"".into()],
            estimated_entries: 120,
            limit: None,
        };
        let root = Operator::Limit {
            input: Box::new(scan),
            limit: Some(10),
            offset: None,
        };
        Plan {
            id: 7,
            type_name: "user".into(),
            root,
            cost: PlanCost {
                index_reads: 120.0,
                record_fetches: 120.0,
                post_filter_rows: 0.0,
                requires_sort: false,
                additional: 0.0,
            },
            total_cost: 600.0,
            estimated_rows: 10.0,
            used_fields: BTreeSet::from(["region".to_string()]),
            used_indexes: vec!["user_region".into()],
            ordering_satisfied: true,
            post_filter: None,
            warnings: vec![],
        }
    }

    #[test]
    fn test_text_layout() {
        let text = explain_text(&sample_plan());
        assert!(text.contains("Plan #7 for 'user'"));
        assert!(text.contains("-> Limit"));
        assert!(text.contains("  -> IndexScan [user_region]"));
        assert!(text.contains("bounds: (\"US\") incl .. (\"US\") incl"));
        assert!(text.contains("reverse: false"));
        assert!(text.contains("est. entries: 120"));
        assert!(text.contains("satisfies: [region = \"US\"]"));
        assert!(text.contains("ordering satisfied: true"));
    }

    #[test]
    fn test_json_document() {
        let doc = explain_json(&sample_plan());
        assert_eq!(doc["estimatedCost"], 600.0);
        assert_eq!(doc["usedIndexes"][0], "user_region");
        assert_eq!(doc["orderingSatisfied"], true);
        assert_eq!(doc["operatorTree"]["operator"], "Limit");
        assert_eq!(
            doc["operatorTree"]["children"][0]["operator"],
            "IndexScan"
        );
        assert_eq!(
            doc["operatorTree"]["children"][0]["index"],
            "user_region"
        );
    }
}
