//! Per-URL workflow: classify → fetch → extract → analyze → persist.
//!
//! Any failure ends the workflow for that URL; nothing is retried. A page
//! without the platform token stops right after classification with no
//! further requests and no writes.

use std::fmt;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use rusqlite::Connection;
use tracing::{error, info, trace};

use crate::analyst::ChatClient;
use crate::classifier;
use crate::db;
use crate::error::Error;
use crate::extractor;
use crate::fetcher;

/// The step that was running when a store analysis failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Classify,
    Fetch,
    Extract,
    Analyze,
    Persist,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Classify => "identifying store",
            Step::Fetch => "fetching website content",
            Step::Extract => "extracting relevant info",
            Step::Analyze => "analyzing store",
            Step::Persist => "storing store data",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum Outcome {
    NotShopify,
    Persisted { store_id: i64 },
    Failed { step: Step, error: Error },
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub persisted: usize,
    pub not_shopify: usize,
    pub failed: usize,
    pub store_ids: Vec<i64>,
    pub failures: Vec<Failure>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Failure {
    pub url: String,
    pub step: Step,
    pub message: String,
}

pub struct Pipeline<'a> {
    http: &'a Client,
    conn: &'a Connection,
    analyst: &'a ChatClient,
    max_body_bytes: u64,
}

impl<'a> Pipeline<'a> {
    pub fn new(http: &'a Client, conn: &'a Connection, analyst: &'a ChatClient, max_body_bytes: u64) -> Self {
        Pipeline {
            http,
            conn,
            analyst,
            max_body_bytes,
        }
    }

    pub fn analyze_store(&self, url: &str) -> Outcome {
        match self.try_analyze_store(url) {
            Ok(outcome) => outcome,
            Err((step, err)) => {
                error!(url, step = ?step, error = %err, "Error {}", step);
                Outcome::Failed { step, error: err }
            }
        }
    }

    fn try_analyze_store(&self, url: &str) -> Result<Outcome, (Step, Error)> {
        let is_shopify = classifier::is_shopify_store(self.http, url, self.max_body_bytes)
            .map_err(|e| (Step::Classify, e))?;
        if !is_shopify {
            info!(url, "Not a Shopify store");
            return Ok(Outcome::NotShopify);
        }

        let html = fetcher::fetch_website_content(self.http, url, self.max_body_bytes)
            .map_err(|e| (Step::Fetch, e))?;
        trace!(url, html = %html, "fetched website content");

        let store_data = extractor::extract_relevant_info(&html).map_err(|e| (Step::Extract, e))?;

        let analysis = self
            .analyst
            .analyze_store(&store_data)
            .map_err(|e| (Step::Analyze, e))?;

        let store_id = db::save_store_with_data(self.conn, url, is_shopify, &analysis, &store_data)
            .map_err(|e| (Step::Persist, e))?;
        info!(url, store_id, "Data stored successfully");
        Ok(Outcome::Persisted { store_id })
    }

    /// Process URLs one after another. A failed URL never stops the rest.
    pub fn run(&self, urls: &[String]) -> RunStats {
        let pb = if urls.len() > 1 {
            let pb = ProgressBar::new(urls.len() as u64);
            if let Ok(style) =
                ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("=> "));
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut stats = RunStats {
            total: urls.len(),
            ..RunStats::default()
        };

        for url in urls {
            pb.set_message(url.clone());
            match self.analyze_store(url) {
                Outcome::Persisted { store_id } => {
                    stats.persisted += 1;
                    stats.store_ids.push(store_id);
                }
                Outcome::NotShopify => stats.not_shopify += 1,
                Outcome::Failed { step, error } => {
                    stats.failed += 1;
                    stats.failures.push(Failure {
                        url: url.clone(),
                        step,
                        message: error.to_string(),
                    });
                }
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
        info!(
            total = stats.total,
            persisted = stats.persisted,
            not_shopify = stats.not_shopify,
            failed = stats.failed,
            "run finished"
        );
        stats
    }
}
