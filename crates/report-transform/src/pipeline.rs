//! Local and global transformation pipelines.
//!
//! Each source's local chain runs on that source's own frame. The global
//! chain then runs over a set of named tables: every source id starts out
//! naming its post-local frame, and every global step writes its result under
//! [`GlobalStep::output_name`], so a later step can consume any source or any
//! earlier output by name.

use std::collections::{HashMap, HashSet};

use polars::prelude::DataFrame;
use report_model::{GlobalStep, Transformation};
use tracing::{debug, info, warn};

use crate::error::{Result, TransformError};
use crate::executors::apply_join;
use crate::frame::union_frames;
use crate::step::TableStep;

/// Run a source's local chain in list order.
pub fn apply_local_chain(mut df: DataFrame, steps: &[Transformation]) -> Result<DataFrame> {
    for (idx, step) in steps.iter().enumerate() {
        df = step.apply(df)?;
        debug!(step = idx, kind = %step.kind(), rows = df.height(), "local step applied");
    }
    Ok(df)
}

/// A source's post-local frame, or `None` when its fetch failed.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub name: String,
    pub frame: Option<DataFrame>,
}

impl SourceTable {
    pub fn available(name: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            name: name.into(),
            frame: Some(frame),
        }
    }

    pub fn unavailable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frame: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub frame: DataFrame,
    /// Indexes of global steps skipped because an input was unavailable.
    pub skipped_steps: Vec<usize>,
}

/// The global chain of a report.
#[derive(Debug, Clone, Copy)]
pub struct GlobalPipeline<'a> {
    steps: &'a [GlobalStep],
}

impl<'a> GlobalPipeline<'a> {
    pub fn new(steps: &'a [GlobalStep]) -> Self {
        Self { steps }
    }

    /// Run every global step in order.
    ///
    /// A step that consumes an unavailable table is skipped and its output
    /// becomes unavailable in turn. The result is the output of the last step
    /// that ran; when none ran it is the union of the available sources in
    /// source order.
    pub fn run(&self, sources: Vec<SourceTable>) -> Result<PipelineOutput> {
        let mut tables: HashMap<String, DataFrame> = HashMap::new();
        let mut unavailable: HashSet<String> = HashSet::new();
        let mut source_order = Vec::new();
        for source in sources {
            match source.frame {
                Some(frame) => {
                    source_order.push(source.name.clone());
                    tables.insert(source.name, frame);
                }
                None => {
                    unavailable.insert(source.name);
                }
            }
        }

        let mut skipped_steps = Vec::new();
        let mut last: Option<DataFrame> = None;
        for (idx, step) in self.steps.iter().enumerate() {
            let inputs = step.transform.inputs();
            let output = step.output_name().to_string();

            if let Some((_, missing)) = inputs.iter().find(|(_, name)| unavailable.contains(*name)) {
                warn!(step = idx, input = %missing, "skipping global step with unavailable input");
                skipped_steps.push(idx);
                tables.remove(&output);
                unavailable.insert(output);
                continue;
            }

            let table = |name: &str| {
                tables
                    .get(name)
                    .ok_or_else(|| TransformError::UnknownInput(name.to_string()))
            };
            let frame = match &step.transform {
                Transformation::Join(join) => apply_join(table(&join.left)?, table(&join.right)?, join)?,
                single => single.apply(table(single.primary_input())?.clone())?,
            };
            info!(
                step = idx,
                kind = %step.transform.kind(),
                output = %output,
                rows = frame.height(),
                "global step applied"
            );

            unavailable.remove(&output);
            tables.insert(output, frame.clone());
            last = Some(frame);
        }

        let frame = match last {
            Some(frame) => frame,
            None => {
                let frames: Vec<DataFrame> = source_order
                    .iter()
                    .filter_map(|name| tables.get(name).cloned())
                    .collect();
                union_frames(&frames)?
            }
        };
        Ok(PipelineOutput {
            frame,
            skipped_steps,
        })
    }
}
