use std::future::Future;
use std::time::Duration;

/// Runs `op` until it succeeds or `attempts` tries have failed, sleeping
/// `backoff` in between. The last error is returned.
pub(crate) async fn retry<T, E, F, Fut>(
    attempts: usize,
    backoff: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => return Err(err),
            Err(_) => {
                attempt += 1;
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
