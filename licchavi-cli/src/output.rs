/// Output formatting: terminal table and JSON.
use licchavi_core::{ContributorScore, History, ItemScore};
use serde::Serialize;

use crate::bail;

/// Everything produced for one criterion.
#[derive(Serialize)]
pub struct CriterionOutput {
    pub criterion: String,
    pub nb_contributors: usize,
    pub global: Vec<ItemScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<Vec<ContributorScore>>,
    pub history: History,
}

/// Global scores sorted best first, ties by item id.
fn ranked(global: &[ItemScore]) -> Vec<&ItemScore> {
    let mut rows: Vec<&ItemScore> = global.iter().collect();
    rows.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.item.cmp(&b.item)));
    rows
}

/// Print results as formatted terminal tables, one per criterion.
pub fn print_table(outputs: &[CriterionOutput]) {
    for (k, out) in outputs.iter().enumerate() {
        if k > 0 {
            println!();
        }
        println!("Criterion: {}", out.criterion);

        let item_width = out
            .global
            .iter()
            .map(|r| r.item.to_string().len())
            .max()
            .unwrap_or(4)
            .max(4); // at least "Item"

        println!(" # | {:<item_width$} |   Score", "Item");
        println!("---|-{}-|---------", "-".repeat(item_width));
        for (i, r) in ranked(&out.global).iter().enumerate() {
            println!("{:>2} | {:<item_width$} | {:>7.2}", i + 1, r.item, r.score);
        }

        if let Some(local) = &out.local {
            println!("\n Contributor | {:<item_width$} |   Score", "Item");
            println!("-------------|-{}-|---------", "-".repeat(item_width));
            for r in local {
                println!("{:>12} | {:<item_width$} | {:>7.2}", r.contributor, r.item, r.score);
            }
        }

        let h = &out.history;
        println!(
            "\n{} items scored from {} contributors over {} epochs",
            out.global.len(),
            out.nb_contributors,
            h.len(),
        );
        if let (Some(fit), Some(gen), Some(reg)) = (h.fit.last(), h.gen.last(), h.reg.last()) {
            println!("Final losses: fit {fit:.2}, gen {gen:.2}, reg {reg:.2}");
        }
    }
}

/// Print results as JSON.
pub fn print_json(outputs: &[CriterionOutput]) {
    let json = serde_json::to_string_pretty(outputs)
        .unwrap_or_else(|e| bail(format!("Failed to serialize output: {e}")));
    println!("{json}");
}
