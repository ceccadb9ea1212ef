use std::cell::RefCell;
use std::path::Path;

use diffpeak_core_rs::source::{Opener, ReadSource};
use eyre::{eyre, Result, WrapErr};
use thread_local::ThreadLocal;

/// Per-thread read-source handles, opened lazily on first use by each worker thread.
pub(crate) struct Sources<'a> {
    opener: &'a dyn Opener,
    paths: &'a [&'a str],
    local: ThreadLocal<RefCell<Vec<Option<Box<dyn ReadSource>>>>>,
}

impl<'a> Sources<'a> {
    pub fn new(opener: &'a dyn Opener, paths: &'a [&'a str]) -> Self {
        Self {
            opener,
            paths,
            local: ThreadLocal::new(),
        }
    }

    pub fn with<R>(
        &self,
        dataset: usize,
        func: impl FnOnce(&mut dyn ReadSource) -> Result<R>,
    ) -> Result<R> {
        let path = self
            .paths
            .get(dataset)
            .ok_or_else(|| eyre!("Unknown dataset {dataset}"))?;
        let mut local = self
            .local
            .get_or(|| RefCell::new((0..self.paths.len()).map(|_| None).collect()))
            .borrow_mut();

        if local[dataset].is_none() {
            let source = self
                .opener
                .open(Path::new(path))
                .wrap_err_with(|| format!("Failed to open {path}"))?;
            local[dataset] = Some(source);
        }
        let source = local[dataset]
            .as_mut()
            .ok_or_else(|| eyre!("Dataset {path} is not opened"))?;
        func(source.as_mut())
    }
}
