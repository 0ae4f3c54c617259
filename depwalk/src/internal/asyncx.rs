use std::future::Future;

use crate::core::Config;

/// Drive a future to completion on the runtime owned by `config`.
///
/// Must not be called from within an asynchronous context.
pub fn block_on<F: Future>(config: &Config, future: F) -> F::Output {
    config.tokio_handle().block_on(future)
}
