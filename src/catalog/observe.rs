use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::watch;

/// Stream the result of `query` now and again after every change signalled
/// on `changes`.
///
/// Changes that land while a query is running are not lost: the version is
/// marked seen before querying, so a later write triggers another emission.
/// The stream ends only if the sending side is dropped; dropping the stream
/// cancels it.
pub(crate) fn watch_query<T, F>(changes: watch::Receiver<u64>, query: F) -> BoxStream<'static, Vec<T>>
where
  T: Send + 'static,
  F: Fn() -> Vec<T> + Send + 'static,
{
  stream::unfold((changes, query, true), |(mut changes, query, first)| async move {
    if !first && changes.changed().await.is_err() {
      return None;
    }
    let _ = changes.borrow_and_update();

    let items = query();
    Some((items, (changes, query, false)))
  })
  .boxed()
}
