//! Reference model of the runtime loader contract that the injected helper
//! reproduces: optional caching, retry with delay, an error callback, and
//! preload / clear-cache / is-cached operations.
//!
//! Each [`LazyLoader`] owns its cache, so independent instances never share
//! results.

use std::{sync::Arc, thread, time::Duration};

use parking_lot::Mutex;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

type ImportFn<T, E> = Box<dyn Fn() -> Result<T, E> + Send + Sync>;
type ErrorCallback<E> = Box<dyn Fn(&E, u32) + Send + Sync>;

pub struct LoaderOptions<E> {
    /// Keep the first successful result and hand it out on later calls.
    pub cache: bool,
    pub retries: u32,
    pub retry_delay: Duration,
    /// Called with the error and the 1-based attempt number on every failure.
    pub on_error: Option<ErrorCallback<E>>,
}

impl<E> Default for LoaderOptions<E> {
    fn default() -> Self {
        Self {
            cache: true,
            retries: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
            on_error: None,
        }
    }
}

impl<E> LoaderOptions<E> {
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn on_error(mut self, f: impl Fn(&E, u32) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

pub struct LazyLoader<T, E> {
    import: ImportFn<T, E>,
    options: LoaderOptions<E>,
    cached: Mutex<Option<Arc<T>>>,
}

impl<T, E> LazyLoader<T, E> {
    pub fn new(import: impl Fn() -> Result<T, E> + Send + Sync + 'static) -> Self {
        Self::with_options(import, LoaderOptions::default())
    }

    pub fn with_options(
        import: impl Fn() -> Result<T, E> + Send + Sync + 'static,
        options: LoaderOptions<E>,
    ) -> Self {
        Self {
            import: Box::new(import),
            options,
            cached: Mutex::new(None),
        }
    }

    /// Loads the module, returning the cached value when there is one.
    /// The last error is returned once all retries are exhausted.
    pub fn load(&self) -> Result<Arc<T>, E> {
        if self.options.cache {
            if let Some(hit) = self.cached.lock().as_ref() {
                return Ok(Arc::clone(hit));
            }
        }

        let value = Arc::new(self.attempt()?);
        if self.options.cache {
            *self.cached.lock() = Some(Arc::clone(&value));
        }
        Ok(value)
    }

    /// Same as [`load`](Self::load); warms the cache ahead of use.
    pub fn preload(&self) -> Result<Arc<T>, E> {
        self.load()
    }

    pub fn clear_cache(&self) {
        self.cached.lock().take();
    }

    pub fn is_cached(&self) -> bool {
        self.cached.lock().is_some()
    }

    fn attempt(&self) -> Result<T, E> {
        let mut attempt = 1;
        loop {
            match (self.import)() {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if let Some(on_error) = &self.options.on_error {
                        on_error(&err, attempt);
                    }
                    if attempt > self.options.retries {
                        return Err(err);
                    }
                    tracing::debug!(attempt, delay_ms = self.options.retry_delay.as_millis() as u64, "retrying import");
                    thread::sleep(self.options.retry_delay);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn counting(fail_first: u32) -> (Arc<AtomicU32>, impl Fn() -> Result<&'static str, String> + Send + Sync) {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let import = move || {
            let n = c.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= fail_first {
                Err(format!("network error {n}"))
            } else {
                Ok("module")
            }
        };
        (calls, import)
    }

    #[test]
    fn retries_until_success_and_reports_each_failure() {
        let (calls, import) = counting(2);
        let errors = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&errors);
        let loader = LazyLoader::with_options(
            import,
            LoaderOptions::default()
                .retries(3)
                .retry_delay(Duration::ZERO)
                .on_error(move |e: &String, attempt| seen.lock().push((e.clone(), attempt))),
        );

        assert_eq!(*loader.load().unwrap(), "module");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *errors.lock(),
            vec![("network error 1".to_string(), 1), ("network error 2".to_string(), 2)]
        );
    }

    #[test]
    fn exhausted_retries_return_last_error() {
        let (calls, import) = counting(10);
        let loader = LazyLoader::with_options(import, LoaderOptions::default().retries(2).retry_delay(Duration::ZERO));
        assert_eq!(loader.load().unwrap_err(), "network error 3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!loader.is_cached());
    }

    #[test]
    fn cache_is_per_instance_and_clearable() {
        let (calls, import) = counting(0);
        let loader = LazyLoader::new(import);
        assert!(!loader.is_cached());
        loader.preload().unwrap();
        assert!(loader.is_cached());
        loader.load().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        loader.clear_cache();
        assert!(!loader.is_cached());
        loader.load().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let (other_calls, other_import) = counting(0);
        let other = LazyLoader::new(other_import);
        assert!(!other.is_cached());
        other.load().unwrap();
        assert_eq!(other_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disabled_cache_imports_every_time() {
        let (calls, import) = counting(0);
        let loader = LazyLoader::with_options(import, LoaderOptions::default().cache(false));
        loader.load().unwrap();
        loader.load().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!loader.is_cached());
    }
}
