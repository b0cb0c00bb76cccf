//! Dynamic container watcher.
//!
//! Cart drawers and theme sections are often re-rendered wholesale, which
//! drops whatever a widget wrote into them. The watcher observes child-list
//! changes across the whole document and re-runs a widget after each batch
//! of changes.
//!
//! Records are drained per wake-up: everything queued when the task wakes
//! is one batch and gets one sync pass. Records produced while that pass
//! runs (including the pass's own writes) form the next batch, so a widget
//! whose sync always rewrites the DOM would keep itself busy. Only widgets
//! that settle, like the load-once upsell panel, should be watched.

use std::fmt;

use tokio::task::JoinHandle;

use crate::dom::Page;
use crate::reactive::{BoundWidget, Concern};

pub struct DynamicContainerWatcher {
    concern: Concern,
    task: JoinHandle<()>,
}

impl DynamicContainerWatcher {
    /// Start watching `page` on behalf of `widget`. Must be called from
    /// within a tokio runtime.
    pub fn spawn(page: &Page, widget: BoundWidget) -> Self {
        let concern = widget.concern();
        let mut records = page.lock().observe();

        let task = tokio::spawn(async move {
            while records.recv().await.is_some() {
                let mut batch = 1usize;
                while records.try_recv().is_ok() {
                    batch += 1;
                }
                if widget.is_disposed() {
                    break;
                }
                tracing::trace!(%concern, batch, "container mutations observed");
                widget.run().await;
            }
            tracing::trace!(%concern, "container watcher stopped");
        });

        tracing::debug!(%concern, "container watcher started");
        Self { concern, task }
    }

    pub fn concern(&self) -> Concern {
        self.concern
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for DynamicContainerWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl fmt::Debug for DynamicContainerWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicContainerWatcher")
            .field("concern", &self.concern)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::reactive::WidgetBinding;
    use futures_util::future::BoxFuture;
    use std::sync::Arc;
    use std::time::Duration;

    struct Counting;

    impl WidgetBinding for Counting {
        fn concern(&self) -> Concern {
            Concern::Upsell
        }

        fn sync(&self) -> BoxFuture<'_, ()> {
            Box::pin(async {})
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn one_pass_per_batch() {
        let page = Page::new(Document::from_html(r#"<div id="drawer"></div>"#));
        let widget = BoundWidget::new(Arc::new(Counting));
        let _watcher = DynamicContainerWatcher::spawn(&page, widget.clone());

        {
            let mut doc = page.lock();
            let drawer = doc.find("#drawer").unwrap();
            doc.set_inner_html(drawer, "<div id=\"cart-upsell\"></div>");
            doc.set_inner_html(drawer, "<div id=\"cart-upsell\" data-first-product-id=\"1\"></div>");
        }
        settle().await;
        assert_eq!(widget.run_count(), 1);

        page.with(|doc| {
            let body = doc.body();
            let extra = doc.create_element("aside");
            doc.append_child(body, extra);
        });
        settle().await;
        assert_eq!(widget.run_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn detached_changes_and_dropped_watchers_are_quiet() {
        let page = Page::new(Document::new());
        let widget = BoundWidget::new(Arc::new(Counting));
        let watcher = DynamicContainerWatcher::spawn(&page, widget.clone());

        page.with(|doc| {
            let loose = doc.create_element("div");
            let child = doc.create_element("span");
            doc.append_child(loose, child);
        });
        settle().await;
        assert_eq!(widget.run_count(), 0);

        drop(watcher);
        settle().await;
        page.with(|doc| {
            let body = doc.body();
            let extra = doc.create_element("aside");
            doc.append_child(body, extra);
        });
        settle().await;
        assert_eq!(widget.run_count(), 0);
        assert_eq!(page.lock().observer_count(), 0);
    }
}
