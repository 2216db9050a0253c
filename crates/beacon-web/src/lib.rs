//! Browser entry point.
//!
//! On module start this opens one `EventSource` on [`EVENTS_PATH`] and binds
//! every message into the live document through the shared dispatcher. The
//! connection lives until the page unloads; reconnection is left to the
//! browser.

use std::cell::RefCell;

use beacon_core::{DiagnosticSink, DispatchError, Dispatcher, TargetResolver};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{console, Document, Element, Event, EventSource, MessageEvent};

/// Stream endpoint, relative to the page origin.
pub const EVENTS_PATH: &str = "/events";

/// Resolves selectors against the live document on every call.
pub struct DocumentTargets {
    document: Document,
}

impl DocumentTargets {
    /// Wrap the page's document.
    pub fn new(document: Document) -> Self {
        Self { document }
    }
}

impl TargetResolver for DocumentTargets {
    type Target = Element;

    fn resolve(&self, selector: &str) -> Option<Element> {
        // an unparsable selector is treated like one with no match
        self.document.query_selector(selector).ok().flatten()
    }

    fn write_text(&mut self, target: &Element, text: &str) {
        target.set_text_content(Some(text));
    }
}

/// Reports dispatch failures on the developer console.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleSink;

impl DiagnosticSink for ConsoleSink {
    fn record(&self, error: &DispatchError) {
        let message = JsValue::from_str(&error.to_string());
        let raw = JsValue::from_str(error.raw());
        match error {
            DispatchError::Decode { .. } => console::error_2(&message, &raw),
            _ => console::warn_2(&message, &raw),
        }
    }
}

/// The page's one stream connection and its handlers.
pub struct LiveConnection {
    source: EventSource,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_error: Closure<dyn FnMut(Event)>,
}

impl LiveConnection {
    /// Open `url` and bind messages into `document`.
    pub fn open(url: &str, document: Document) -> Result<Self, JsValue> {
        let source = EventSource::new(url)?;

        let dispatcher = Dispatcher::new(ConsoleSink);
        let mut targets = DocumentTargets::new(document);
        let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            match event.data().as_string() {
                Some(raw) => {
                    let _ = dispatcher.dispatch(&raw, &mut targets);
                }
                None => console::warn_1(&JsValue::from_str("event stream message without text data")),
            }
        });
        source.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        let state_source = source.clone();
        let on_error = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            let state = state_source.ready_state();
            if state == EventSource::CLOSED {
                console::error_1(&JsValue::from_str("event stream closed"));
            } else {
                console::warn_2(
                    &JsValue::from_str("event stream error, browser will reconnect"),
                    &JsValue::from(state),
                );
            }
        });
        source.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        Ok(Self {
            source,
            _on_message: on_message,
            _on_error: on_error,
        })
    }

    /// `EventSource.readyState`: 0 connecting, 1 open, 2 closed.
    pub fn ready_state(&self) -> u16 {
        self.source.ready_state()
    }
}

impl Drop for LiveConnection {
    fn drop(&mut self) {
        self.source.set_onmessage(None);
        self.source.set_onerror(None);
        self.source.close();
    }
}

thread_local! {
    static CONNECTION: RefCell<Option<LiveConnection>> = const { RefCell::new(None) };
}

/// Module start: install the panic hook and open the page's connection.
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document to bind into"))?;

    let connection = LiveConnection::open(EVENTS_PATH, document)?;
    CONNECTION.with(|slot| *slot.borrow_mut() = Some(connection));
    Ok(())
}

/// Close the page's connection, e.g. from an unload handler.
#[wasm_bindgen]
pub fn stop() {
    CONNECTION.with(|slot| drop(slot.borrow_mut().take()));
}
