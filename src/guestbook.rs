//! Guestbook form and list. New entries are stored unapproved and only show
//! up once a moderator approves them.

use crate::browser::{self, html};
use crate::config::GuestbookConfig;
use crate::store::{
    or_empty, GuestbookEntry, GuestbookStore, NewGuestbookEntry, Store, StoreError, StoreResult,
    DEFAULT_AVATAR,
};
use anyhow::{anyhow, Result};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys::{
    Element, Event, HtmlElement, HtmlFormElement, HtmlInputElement, HtmlSelectElement,
    HtmlTextAreaElement,
};

pub const AWAITING_APPROVAL: &str = "Thank you! Your entry will appear once it has been approved.";

/// `YYYY-MM-DD` part of a timestamp, empty when it does not start with one.
pub fn format_date(created_at: &str) -> &str {
    let Some(date) = created_at.get(..10) else {
        return "";
    };
    let bytes = date.as_bytes();
    let shaped = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if shaped {
        date
    } else {
        ""
    }
}

fn render_entry(entry: &GuestbookEntry) -> String {
    let avatar = entry
        .avatar_emoji
        .as_deref()
        .filter(|avatar| !avatar.trim().is_empty())
        .unwrap_or(DEFAULT_AVATAR);
    let date = entry.created_at.as_deref().map(format_date).unwrap_or("");
    format!(
        r#"<article class="guestbook-entry"><header><span class="guestbook-avatar">{}</span><strong class="guestbook-name">{}</strong><time class="guestbook-date">{date}</time></header><p class="guestbook-message">{}</p></article>"#,
        html::escape(avatar),
        html::escape(&entry.name),
        html::escape(&entry.message),
    )
}

/// List markup, entries in the order given (the store returns newest first).
pub fn render(entries: &[GuestbookEntry]) -> String {
    if entries.is_empty() {
        return r#"<p class="guestbook-empty">No entries yet. Leave the first one!</p>"#.to_string();
    }
    entries.iter().map(render_entry).collect()
}

/// Status line after a submit attempt.
pub fn submit_status(result: &StoreResult<GuestbookEntry>) -> String {
    match result {
        Ok(_) => AWAITING_APPROVAL.to_string(),
        Err(StoreError::Invalid(reason)) => reason.clone(),
        Err(StoreError::Offline) => "The guestbook is offline right now.".to_string(),
        Err(err) => format!("Error: {err}"),
    }
}

/// Validate and store one entry.
pub async fn submit<S>(store: &S, name: &str, message: &str, avatar: &str) -> StoreResult<GuestbookEntry>
where
    S: GuestbookStore + ?Sized,
{
    let entry = NewGuestbookEntry::new(name, message, avatar)?;
    let saved = store.submit_guestbook_entry(entry).await?;
    tracing::info!("guestbook entry submitted");
    Ok(saved)
}

pub struct Guestbook {
    form: Option<HtmlFormElement>,
    list: Option<Element>,
    status: Option<HtmlElement>,
    store: Rc<dyn Store>,
    limit: usize,
}

fn field_value(form: &HtmlFormElement, name: &str) -> String {
    let Ok(Some(element)) = form.query_selector(&format!("[name=\"{name}\"]")) else {
        return String::new();
    };
    if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        input.value()
    } else if let Some(area) = element.dyn_ref::<HtmlTextAreaElement>() {
        area.value()
    } else if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
        select.value()
    } else {
        String::new()
    }
}

impl Guestbook {
    /// `None` when the page has neither a form nor a list.
    pub fn attach(config: &GuestbookConfig, store: Rc<dyn Store>) -> Result<Option<Rc<Self>>> {
        let form = browser::element_by_id(&config.form_id)
            .ok()
            .map(|element| {
                element
                    .dyn_into::<HtmlFormElement>()
                    .map_err(|element| anyhow!("Error converting {:#?} to HtmlFormElement", element))
            })
            .transpose()?;
        let list = browser::element_by_id(&config.list_id).ok();
        if form.is_none() && list.is_none() {
            tracing::debug!("no guestbook on this page");
            return Ok(None);
        }

        let status = match &form {
            Some(form) => Some(Self::status_element(form)?),
            None => None,
        };
        let guestbook = Rc::new(Guestbook {
            form,
            list,
            status,
            store,
            limit: config.limit,
        });

        if let Some(form) = &guestbook.form {
            let handle = Rc::downgrade(&guestbook);
            browser::listen(form, "submit", move |event: Event| {
                event.prevent_default();
                if let Some(guestbook) = handle.upgrade() {
                    guestbook.submit_form();
                }
            })?;
        }
        guestbook.refresh();
        Ok(Some(guestbook))
    }

    fn status_element(form: &HtmlFormElement) -> Result<HtmlElement> {
        if let Ok(Some(existing)) = form.query_selector(".guestbook-status") {
            return existing
                .dyn_into::<HtmlElement>()
                .map_err(|element| anyhow!("Error converting {:#?} to HtmlElement", element));
        }
        let status: HtmlElement = browser::create_element("p")?;
        status.set_class_name("guestbook-status");
        form.append_child(&status)
            .map_err(|err| anyhow!("Could not add guestbook status : {:#?}", err))?;
        Ok(status)
    }

    fn set_status(&self, text: &str) {
        if let Some(status) = &self.status {
            status.set_text_content(Some(text));
        }
    }

    fn submit_form(self: &Rc<Self>) {
        let Some(form) = &self.form else {
            return;
        };
        let name = field_value(form, "name");
        let message = field_value(form, "message");
        let avatar = field_value(form, "avatar");
        self.set_status("Sending…");

        let guestbook = self.clone();
        browser::spawn_local(async move {
            let result = submit(guestbook.store.as_ref(), &name, &message, &avatar).await;
            match &result {
                Ok(_) => {
                    if let Some(form) = &guestbook.form {
                        form.reset();
                    }
                }
                Err(err) => tracing::warn!("guestbook submit failed: {err}"),
            }
            guestbook.set_status(&submit_status(&result));
        });
    }

    /// Reload the approved entries into the list.
    pub fn refresh(self: &Rc<Self>) {
        if self.list.is_none() {
            return;
        }
        let guestbook = self.clone();
        browser::spawn_local(async move {
            let entries = or_empty(
                guestbook.store.fetch_approved_entries(guestbook.limit).await,
                "guestbook",
            );
            if let Some(list) = &guestbook.list {
                list.set_inner_html(&render(&entries));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, OfflineStore};
    use futures::executor::block_on;

    fn entry(name: &str, message: &str, created_at: Option<&str>) -> GuestbookEntry {
        GuestbookEntry {
            id: Some(1),
            name: name.into(),
            message: message.into(),
            avatar_emoji: None,
            is_approved: true,
            created_at: created_at.map(str::to_string),
        }
    }

    #[test]
    fn dates_are_cut_to_the_day() {
        assert_eq!(format_date("2024-05-17T09:30:00.123+00:00"), "2024-05-17");
        assert_eq!(format_date("2024-05-17"), "2024-05-17");
        assert_eq!(format_date("yesterday"), "");
        assert_eq!(format_date("17.05.2024 10:00"), "");
    }

    #[test]
    fn entries_render_escaped_with_a_default_avatar() {
        let markup = render(&[entry(
            "Ada <admin>",
            "Nice tank & fish",
            Some("2024-01-02T10:00:00Z"),
        )]);
        assert!(markup.contains("Ada &lt;admin&gt;"));
        assert!(markup.contains("Nice tank &amp; fish"));
        assert!(markup.contains(DEFAULT_AVATAR));
        assert!(markup.contains("<time class=\"guestbook-date\">2024-01-02</time>"));
    }

    #[test]
    fn submitted_entries_wait_for_approval() {
        let store = MemoryStore::new();
        let result = block_on(submit(&store, "Ada", "Hello!", ""));
        assert_eq!(submit_status(&result), AWAITING_APPROVAL);
        assert!(!result.unwrap().is_approved);
        assert!(block_on(store.fetch_approved_entries(10)).unwrap().is_empty());
    }

    #[test]
    fn invalid_and_offline_submits_explain_themselves() {
        let store = MemoryStore::new();
        let result = block_on(submit(&store, "  ", "Hello!", ""));
        assert_eq!(submit_status(&result), "Name must be 1-50 characters");

        let result = block_on(submit(&OfflineStore, "Ada", "Hello!", "🐙"));
        assert_eq!(submit_status(&result), "The guestbook is offline right now.");
    }
}
