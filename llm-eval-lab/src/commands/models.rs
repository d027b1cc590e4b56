//! Model listing

use anyhow::Result;
use colored::Colorize;
use comfy_table::Cell;
use llm_eval_inference::KNOWN_MODELS;
use serde::Serialize;

use crate::context::AppContext;
use crate::output::{print_field, print_section, TableDisplay};

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub probability_detail: bool,
}

impl TableDisplay for ModelInfo {
    fn to_row(&self) -> Vec<Cell> {
        let detail = if self.probability_detail {
            "yes".green().to_string()
        } else {
            "no".dimmed().to_string()
        };
        vec![Cell::new(&self.id), Cell::new(detail)]
    }

    fn display_single(&self) {
        print_section("Model");
        print_field("ID", &self.id);
        print_field("Logprobs", if self.probability_detail { "yes" } else { "no" });
    }
}

pub fn known_models(ctx: &AppContext) -> Vec<ModelInfo> {
    KNOWN_MODELS
        .iter()
        .map(|id| ModelInfo {
            id: id.to_string(),
            probability_detail: ctx.registry().supports_probability_detail(id),
        })
        .collect()
}

pub fn list(ctx: &AppContext) -> Result<()> {
    ctx.output.write_list(&known_models(ctx), &["Model", "Logprobs"])
}
