//! The engine's public entry points.
//!
//! A [`MarkdownEngine`] owns its parse cache and performance history; two
//! engines never share state. Both sit behind mutexes so one engine can be
//! shared across threads.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use crate::blocks::{Block, BlockTree, BlockType};
use crate::error::EngineError;
use crate::identity::IdAssigner;
use crate::parsing::kinds::{CalloutStyle, ToggleReassembly};
use crate::parsing::{ConvertMode, ConvertOptions, ParserExtensions};
use crate::performance::{
    CacheOptions, CacheStats, ComplexityScore, ParseCache, ParseMetrics, PerformanceMonitor,
    Strategy, StrategyThresholds, run_strategy,
};
use crate::recovery::{Recovery, RecoveryOptions};
use crate::serialize::{Serializer, SerializerSettings};
use crate::validation::{validate_blocks, validate_input, validate_input_bytes};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    pub callout_style: CalloutStyle,
    pub toggles: ToggleReassembly,
    /// Extensions for the standard and batched strategies.
    pub extensions: ParserExtensions,
    pub thresholds: StrategyThresholds,
    pub cache: CacheOptions,
    /// Used by [`MarkdownEngine::parse`]; `parse_with_fallback` takes its own.
    pub recovery: RecoveryOptions,
    pub monitor_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            callout_style: CalloutStyle::default(),
            toggles: ToggleReassembly::default(),
            extensions: ParserExtensions::full(),
            thresholds: StrategyThresholds::default(),
            cache: CacheOptions::default(),
            recovery: RecoveryOptions::default(),
            monitor_capacity: 64,
        }
    }
}

impl SerializerSettings for EngineOptions {
    fn callout_style(&self) -> CalloutStyle {
        self.callout_style
    }
}

/// Either a result or the error that replaced it; `{"result": …}` or
/// `{"error": …}` in JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeOutcome<T> {
    Result(T),
    Error(EngineError),
}

impl<T> SafeOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, SafeOutcome::Result(_))
    }

    pub fn into_result(self) -> Result<T, EngineError> {
        match self {
            SafeOutcome::Result(value) => Ok(value),
            SafeOutcome::Error(err) => Err(err),
        }
    }
}

impl<T> From<Result<T, EngineError>> for SafeOutcome<T> {
    fn from(result: Result<T, EngineError>) -> Self {
        match result {
            Ok(value) => SafeOutcome::Result(value),
            Err(err) => SafeOutcome::Error(err),
        }
    }
}

/// What the controller would do with a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub complexity: ComplexityScore,
    pub strategy: Strategy,
}

pub struct MarkdownEngine {
    options: EngineOptions,
    assigner: IdAssigner,
    cache: Mutex<ParseCache>,
    monitor: Mutex<PerformanceMonitor>,
}

impl Default for MarkdownEngine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl MarkdownEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            assigner: IdAssigner::new(),
            cache: Mutex::new(ParseCache::new(options.cache)),
            monitor: Mutex::new(PerformanceMonitor::new(options.monitor_capacity)),
            options,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn parse(&self, text: &str) -> Result<BlockTree, EngineError> {
        self.parse_inner(text, None, &self.options.recovery)
    }

    /// Parses UTF-8 bytes; anything else is invalid input.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<BlockTree, EngineError> {
        self.parse(validate_input_bytes(bytes)?)
    }

    /// Parses an edited text, carrying IDs over from `previous` wherever a
    /// block's type and normalized content are unchanged.
    pub fn reparse(&self, text: &str, previous: &BlockTree) -> Result<BlockTree, EngineError> {
        self.parse_inner(text, Some(previous), &self.options.recovery)
    }

    pub fn parse_with_fallback(
        &self,
        text: &str,
        recovery: &RecoveryOptions,
    ) -> Result<BlockTree, EngineError> {
        self.parse_inner(text, None, recovery)
    }

    pub fn serialize(&self, blocks: &[Block]) -> Result<String, EngineError> {
        Serializer::new(&self.options).serialize(blocks)
    }

    /// [`parse`](Self::parse) that reports panics as errors instead of
    /// unwinding.
    pub fn safe_parse(&self, text: &str) -> SafeOutcome<BlockTree> {
        guarded(|| self.parse(text))
    }

    pub fn safe_serialize(&self, blocks: &[Block]) -> SafeOutcome<String> {
        guarded(|| self.serialize(blocks))
    }

    pub fn analyze(&self, text: &str) -> Analysis {
        let complexity = ComplexityScore::measure(text);
        Analysis {
            complexity,
            strategy: self
                .options
                .thresholds
                .select(complexity.bytes, complexity.score),
        }
    }

    /// Reads a block array from host JSON. Blocks of unknown type are
    /// dropped with a warning, together with their children.
    pub fn blocks_from_json(&self, json: &str) -> Result<Vec<Block>, EngineError> {
        let mut value: Value = serde_json::from_str(json)
            .map_err(|e| EngineError::invalid_input(format!("blocks are not valid JSON: {e}")))?;
        let Value::Array(items) = &mut value else {
            return Err(EngineError::invalid_input("blocks must be a JSON array"));
        };
        prune_unknown_types(items)?;
        serde_json::from_value(value)
            .map_err(|e| EngineError::invalid_input(format!("malformed block: {e}")))
    }

    pub fn blocks_to_json(&self, blocks: &[Block]) -> Result<String, EngineError> {
        serde_json::to_string_pretty(blocks).map_err(|e| EngineError::serialization(e.to_string()))
    }

    pub fn metrics(&self) -> Vec<ParseMetrics> {
        self.monitor().history().cloned().collect()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache().stats()
    }

    pub fn clear_cache(&self) {
        self.cache().clear();
    }

    fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            mode: ConvertMode::Full,
            toggles: self.options.toggles,
            extensions: self.options.extensions,
        }
    }

    fn parse_inner(
        &self,
        text: &str,
        previous: Option<&BlockTree>,
        recovery: &RecoveryOptions,
    ) -> Result<BlockTree, EngineError> {
        validate_input(text)?;
        let started = Instant::now();
        let analysis = self.analyze(text);

        // a re-parse must merge with `previous`, which a cached tree never has
        if previous.is_none()
            && let Some(tree) = self.cache().get(text)
        {
            self.record(&analysis, tree.len(), started, true);
            return Ok(tree);
        }

        let convert = self.convert_options();
        let strategy = analysis.strategy;
        let parser = |t: &str| run_strategy(strategy, t, &convert);

        let (blocks, doc_len) = match parser(text) {
            Ok(blocks) => (blocks, text.len()),
            Err(err) => {
                log::warn!("{strategy} parse failed: {err}");
                let recovered = Recovery::new(recovery).run(text, &parser, err)?;
                (recovered.blocks, recovered.text.len())
            }
        };

        let tree = match previous {
            Some(previous) => self.assigner.assign_preserving(blocks, doc_len, previous),
            None => self.assigner.assign(blocks, doc_len),
        };
        validate_blocks(&tree)?;

        // ids carried over from `previous` are not what a plain parse yields
        if previous.is_none() {
            self.cache().insert(text, tree.clone());
        }
        self.record(&analysis, tree.len(), started, false);
        Ok(tree)
    }

    fn record(&self, analysis: &Analysis, block_count: usize, started: Instant, cache_hit: bool) {
        self.monitor().record(ParseMetrics {
            strategy: analysis.strategy,
            score: analysis.complexity.score,
            bytes: analysis.complexity.bytes,
            block_count,
            duration: started.elapsed(),
            cache_hit,
        });
    }

    fn cache(&self) -> MutexGuard<'_, ParseCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn monitor(&self) -> MutexGuard<'_, PerformanceMonitor> {
        self.monitor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn guarded<T>(f: impl FnOnce() -> Result<T, EngineError>) -> SafeOutcome<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result.into(),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("engine panicked: {message}");
            SafeOutcome::Error(EngineError::parse(format!("internal error: {message}")))
        }
    }
}

fn prune_unknown_types(items: &mut Vec<Value>) -> Result<(), EngineError> {
    for (index, item) in items.iter().enumerate() {
        if !item.is_object() {
            return Err(EngineError::invalid_input(format!("block {index} is not an object")));
        }
    }
    items.retain(|item| match item.get("type").and_then(Value::as_str) {
        Some(name) if BlockType::from_name(name).is_some() => true,
        other => {
            log::warn!("skipping block of unsupported type {other:?}");
            false
        }
    });
    for item in items.iter_mut() {
        if let Some(Value::Array(children)) = item.get_mut("children") {
            prune_unknown_types(children)?;
        }
    }
    Ok(())
}
