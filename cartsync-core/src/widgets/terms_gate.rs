//! Checkout terms gate.
//!
//! Checkout controls are blocked until the terms checkbox is checked. A
//! sync pass binds a capturing listener to every checkout trigger that is
//! not bound yet (and to the trigger's enclosing form), so triggers that
//! appear after a cart re-render get bound on the next pass. The listener
//! reads the checkbox when the user activates the trigger, not when it was
//! bound.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use indexmap::IndexSet;

use crate::config::TermsConfig;
use crate::dom::{
    parse_selector, Document, Event, EventKind, Listener, NodeId, Page, Selector, WeakPage,
};
use crate::error::SelectorError;
use crate::reactive::{Concern, WidgetBinding};

/// Node flag marking triggers and forms that already carry the listener.
pub const BOUND_FLAG: &str = "terms-bound";

/// State shared by the gate and every listener it installs.
struct Rules {
    checkboxes: Vec<Selector>,
    wrapper: Selector,
    warning: Selector,
    warning_class: String,
    warning_text: String,
    warning_ttl: Duration,
    page: WeakPage,
}

impl Rules {
    fn checkbox(&self, doc: &Document) -> Option<NodeId> {
        self.checkboxes.iter().find_map(|s| doc.query_selector(s))
    }

    fn enforce(&self, event: &mut Event, doc: &mut Document) {
        let checkbox = self.checkbox(doc);
        if checkbox.is_some_and(|cb| doc.is_checked(cb)) {
            return;
        }

        event.prevent_default();
        event.stop_propagation();
        tracing::debug!(kind = ?event.kind(), "checkout blocked, terms not accepted");

        if let Some(checkbox) = checkbox {
            self.warn(doc, checkbox);
        }
    }

    /// Show the warning next to the checkbox, at most one per wrapper.
    fn warn(&self, doc: &mut Document, checkbox: NodeId) {
        let Some(wrapper) = doc
            .closest(checkbox, &self.wrapper)
            .or_else(|| doc.parent(checkbox))
        else {
            return;
        };
        if doc.query_selector_within(wrapper, &self.warning).is_some() {
            return;
        }

        let popup = doc.create_element("div");
        doc.set_attr(popup, "class", &self.warning_class);
        doc.set_text(popup, &self.warning_text);
        let style = with_relative_position(doc.attr(wrapper, "style"));
        doc.set_attr(wrapper, "style", &style);
        doc.append_child(wrapper, popup);

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let page = self.page.clone();
                let ttl = self.warning_ttl;
                runtime.spawn(async move {
                    tokio::time::sleep(ttl).await;
                    if let Some(page) = page.upgrade() {
                        page.lock().remove(popup);
                    }
                });
            }
            Err(_) => tracing::trace!("no runtime, terms warning will not expire"),
        }
    }
}

/// Compound selector matching elements that carry every class in `classes`.
fn class_selector(classes: &str) -> String {
    classes
        .split_whitespace()
        .flat_map(|class| [".", class])
        .collect()
}

fn with_relative_position(style: Option<&str>) -> String {
    match style.map(str::trim).filter(|s| !s.is_empty()) {
        None => "position: relative".to_string(),
        Some(existing) => {
            let kept: Vec<&str> = existing
                .split(';')
                .map(str::trim)
                .filter(|decl| !decl.is_empty() && !decl.starts_with("position"))
                .collect();
            if kept.is_empty() {
                "position: relative".to_string()
            } else {
                format!("{}; position: relative", kept.join("; "))
            }
        }
    }
}

pub struct TermsGate {
    page: Page,
    triggers: Vec<Selector>,
    form: Selector,
    rules: Arc<Rules>,
}

impl TermsGate {
    pub fn new(page: Page, config: &TermsConfig) -> Result<Self, SelectorError> {
        let parse_all = |list: &[String]| -> Result<Vec<Selector>, SelectorError> {
            list.iter().map(|s| parse_selector(s)).collect()
        };

        let rules = Rules {
            checkboxes: parse_all(&config.checkbox_selectors)?,
            wrapper: parse_selector(&config.wrapper_selector)?,
            warning: parse_selector(&class_selector(&config.warning_class))?,
            warning_class: config.warning_class.clone(),
            warning_text: config.warning_text.clone(),
            warning_ttl: config.warning_ttl(),
            page: page.downgrade(),
        };

        Ok(Self {
            triggers: parse_all(&config.trigger_selectors)?,
            form: parse_selector("form")?,
            rules: Arc::new(rules),
            page,
        })
    }

    /// Every trigger match, in selector order, without duplicates.
    fn triggers(&self, doc: &Document) -> IndexSet<NodeId> {
        self.triggers
            .iter()
            .flat_map(|s| doc.query_selector_all(s))
            .collect()
    }

    /// Bind the listener to unbound triggers. Returns how many were bound.
    pub fn bind(&self) -> usize {
        let mut doc = self.page.lock();
        if self.rules.checkbox(&doc).is_none() {
            tracing::trace!("no terms checkbox, nothing to gate");
            return 0;
        }
        let triggers = self.triggers(&doc);
        if triggers.is_empty() {
            tracing::trace!("no checkout triggers");
            return 0;
        }

        let rules = Arc::clone(&self.rules);
        let listener: Listener =
            Arc::new(move |event: &mut Event, doc: &mut Document| rules.enforce(event, doc));

        let mut bound = 0;
        for trigger in triggers {
            if !doc.set_flag(trigger, BOUND_FLAG) {
                continue;
            }
            if doc.matches(trigger, &self.form) {
                doc.add_event_listener(trigger, EventKind::Submit, true, Arc::clone(&listener));
            } else {
                doc.add_event_listener(trigger, EventKind::Click, true, Arc::clone(&listener));
                if let Some(form) = doc.closest(trigger, &self.form) {
                    if doc.set_flag(form, BOUND_FLAG) {
                        doc.add_event_listener(form, EventKind::Submit, true, Arc::clone(&listener));
                    }
                }
            }
            bound += 1;
        }

        if bound > 0 {
            tracing::debug!(bound, "checkout triggers bound");
        }
        bound
    }
}

impl WidgetBinding for TermsGate {
    fn concern(&self) -> Concern {
        Concern::TermsGate
    }

    fn sync(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.bind();
        })
    }
}
