// src/lexer/config.rs
use serde::{Deserialize, Serialize};

use super::{buffer::MIN_BUFFER_SIZE, fold::CaseFold};

/// Knobs for one scanner instance. Defaults match the classic generated
/// scanners: an 8 KiB (+256) window, 8-column tabs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Initial size of each source's byte window. Grows on demand.
    pub buffer_size: usize,
    pub tab_width: u32,
    /// Initial capacity reserved for suspended sources.
    pub file_stack_capacity: usize,
    /// Initial capacity reserved for saved modes.
    pub mode_stack_capacity: usize,
    pub case_fold: CaseFold,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1024 * 8 + 256,
            tab_width: 8,
            file_stack_capacity: 8,
            mode_stack_capacity: 16,
            case_fold: CaseFold::Ascii,
        }
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|s| s.parse::<usize>().ok())
}

impl ScannerConfig {
    /// Defaults overlaid with `TABLESCAN_BUFFER_SIZE`, `TABLESCAN_TAB_WIDTH`
    /// and `TABLESCAN_CASE_FOLD` where those parse.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(n) = env_usize("TABLESCAN_BUFFER_SIZE") {
            cfg.buffer_size = n;
        }
        if let Some(n) = env_usize("TABLESCAN_TAB_WIDTH") {
            cfg.tab_width = n.min(u32::MAX as usize) as u32;
        }
        if let Some(fold) = std::env::var("TABLESCAN_CASE_FOLD")
            .ok()
            .and_then(|s| CaseFold::parse(&s))
        {
            cfg.case_fold = fold;
        }
        cfg.normalized()
    }

    pub fn with_buffer_size(mut self, n: usize) -> Self {
        self.buffer_size = n;
        self.normalized()
    }

    pub fn with_tab_width(mut self, n: u32) -> Self {
        self.tab_width = n;
        self.normalized()
    }

    pub fn normalized(mut self) -> Self {
        self.buffer_size = self.buffer_size.max(MIN_BUFFER_SIZE);
        self.tab_width = self.tab_width.max(1);
        self
    }
}
