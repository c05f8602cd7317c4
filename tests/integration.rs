//! Integration tests for trellis-ui.
//!
//! These tests exercise the public API from outside the crate: markup in,
//! live styled widgets out, with modules arriving over the remote-fetch
//! path.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::sync::mpsc;

use trellis_ui::css::Stylesheet;
use trellis_ui::host::{EventCallback, PropValue, WidgetRef};
use trellis_ui::markup::{parse, MarkupError};
use trellis_ui::materialize::Materializer;
use trellis_ui::registry::{
    ChannelAuthority, ModulePayload, Registry, SessionToken,
};
use trellis_ui::testing::MockHost;
use trellis_ui::value::Value;

const CONSOLE_MARKUP: &str = r#"
<Button id="console" class="chrome draggable">
    <Button id="header" onactivate="console:raise">
        <Panel id="tabstrip"/>
        <Label id="cross" text="X" onactivate="console:close"/>
    </Button>
    <Panel id="page-terminal" class="page">
        <Label id="output" text="ready &gt; _"/>
    </Panel>
    <Panel id="page-code" class="page"/>
</Button>
"#;

const CONSOLE_CSS: &str = r#"
// chrome
#console {
    width: 1000px;
    height: 700px;
    flow-children: down;
}

#header {
    width: 100%;
    height: 30px;
    background-color: #40444a;
}

#header #cross {
    horizontal-align: right;
    color: #8590a3;
}

.page {
    width: 100%;
    height: 100%;
    background-color: #323539;
}

#console.closed .page {
    opacity: 0;
}
"#;

fn find_by_id(widget: &WidgetRef, id: &str) -> WidgetRef {
    try_find(widget, id).unwrap_or_else(|| panic!("no widget with id {id:?}"))
}

fn try_find(widget: &WidgetRef, id: &str) -> Option<WidgetRef> {
    if widget.id() == id {
        return Some(widget.clone());
    }
    widget
        .children()
        .into_iter()
        .find_map(|child| try_find(&child, id))
}

// ---------------------------------------------------------------------------
// Markup → widgets → styles
// ---------------------------------------------------------------------------

#[test]
fn console_window_materializes_and_styles() {
    let host = MockHost::new();
    let nodes = parse(CONSOLE_MARKUP).unwrap();

    let fired: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = fired.clone();
    let on_event: EventCallback = Rc::new(move |token, _args| {
        sink.borrow_mut().push(token.to_owned());
    });

    let created = Materializer::new(&host)
        .materialize(&host.root(), &nodes, Some(&on_event))
        .unwrap();
    assert_eq!(created.len(), 1);

    let console = &created[0];
    assert_eq!(console.id(), "console");
    assert!(console.has_class("chrome"));
    assert!(console.has_class("draggable"));

    // Entity-decoded attribute made it onto the widget.
    let output = find_by_id(console, "output");
    assert_eq!(
        output.property("text"),
        Some(PropValue::String("ready > _".into()))
    );

    // Styling: descendant and compound selectors resolve against the tree.
    let sheet = Stylesheet::parse(CONSOLE_CSS);
    sheet.apply(console);

    assert_eq!(console.style("width").unwrap(), "1000px");
    let cross = find_by_id(console, "cross");
    assert_eq!(cross.style("horizontal-align").unwrap(), "right");
    let terminal = find_by_id(console, "page-terminal");
    assert_eq!(terminal.style("background-color").unwrap(), "#323539");
    // `.closed` is not set yet.
    assert!(terminal.style("opacity").is_none());

    // Events reach the sink with their correlation tokens.
    let header = find_by_id(console, "header");
    host.fire(&header, "onactivate", &[]);
    host.fire(&cross, "onactivate", &[]);
    assert_eq!(
        fired.borrow().clone(),
        vec!["console:raise".to_owned(), "console:close".to_owned()]
    );
}

#[test]
fn state_change_restyle_is_idempotent() {
    let host = MockHost::new();
    let nodes = parse(CONSOLE_MARKUP).unwrap();
    let created = Materializer::new(&host)
        .materialize(&host.root(), &nodes, None)
        .unwrap();
    let console = &created[0];
    let sheet = Stylesheet::parse(CONSOLE_CSS);

    sheet.apply(console);
    let terminal = find_by_id(console, "page-terminal");
    assert!(terminal.style("opacity").is_none());

    // Host-side state flips a class; re-application picks up the rule.
    console.add_class("closed");
    sheet.apply(console);
    assert_eq!(terminal.style("opacity").unwrap(), "0");

    // Applying again changes nothing.
    sheet.apply(console);
    assert_eq!(terminal.style("opacity").unwrap(), "0");
    assert_eq!(terminal.style("background-color").unwrap(), "#323539");
}

#[test]
fn unbalanced_markup_never_reaches_the_factory() {
    let host = MockHost::new();
    let err = parse("<Panel><Label></Other></Panel>").unwrap_err();
    assert!(matches!(err, MarkupError::MismatchedClose { .. }));
    // Nothing was created because nothing was materialized.
    assert_eq!(host.widget_count("Label"), 0);
}

// ---------------------------------------------------------------------------
// Remote module fetch
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "current_thread")]
async fn remote_module_fetch_end_to_end() {
    let (request_tx, mut request_rx) = mpsc::unbounded_channel();
    let (payload_tx, mut payload_rx) = mpsc::unbounded_channel();
    let session = SessionToken::new("client-1");
    let registry = Registry::with_authority(
        Rc::new(ChannelAuthority::new(request_tx)),
        session.clone(),
    );

    // Two fragments, neither present locally.
    let console = registry.import("ui/console");
    let themes = registry.import("ui/themes");

    let ready_runs = Rc::new(RefCell::new(0));
    let counter = ready_runs.clone();
    registry.ready(move || *counter.borrow_mut() += 1);
    assert_eq!(*ready_runs.borrow(), 0);

    // The authority answers the first request.
    let request = request_rx.recv().await.unwrap();
    assert_eq!(request.module, "ui/console");
    assert_eq!(request.token, session);
    payload_tx
        .send(ModulePayload {
            module: request.module,
            token: request.token,
            definition: serde_json::json!({
                "markup": "<Panel id=\"console\"/>",
                "tabs": 2,
            }),
        })
        .unwrap();

    // One driver tick: first payload lands, barrier still holds.
    assert_eq!(registry.drain_inbound(&mut payload_rx), 1);
    assert_eq!(*ready_runs.borrow(), 0);
    assert_eq!(
        console.borrow().get("markup"),
        Some(&Value::from("<Panel id=\"console\"/>"))
    );

    // Second request answered; next tick releases the barrier.
    let request = request_rx.recv().await.unwrap();
    assert_eq!(request.module, "ui/themes");
    payload_tx
        .send(ModulePayload {
            module: request.module,
            token: request.token,
            definition: serde_json::json!({ "default": "dark" }),
        })
        .unwrap();
    assert_eq!(registry.drain_inbound(&mut payload_rx), 1);

    assert_eq!(*ready_runs.borrow(), 1);
    assert_eq!(themes.borrow().get("default"), Some(&Value::from("dark")));
}

#[tokio::test(flavor = "current_thread")]
async fn stale_session_payloads_are_dropped() {
    let (request_tx, mut request_rx) = mpsc::unbounded_channel();
    let (payload_tx, mut payload_rx) = mpsc::unbounded_channel();
    let registry = Registry::with_authority(
        Rc::new(ChannelAuthority::new(request_tx)),
        SessionToken::new("current"),
    );

    registry.import("ui/console");
    let request = request_rx.recv().await.unwrap();

    // A reply addressed to a previous session arrives first.
    payload_tx
        .send(ModulePayload {
            module: request.module.clone(),
            token: SessionToken::new("previous"),
            definition: serde_json::json!({ "stale": true }),
        })
        .unwrap();
    registry.drain_inbound(&mut payload_rx);
    assert!(!registry.is_ready());

    // The real reply resolves the module.
    payload_tx
        .send(ModulePayload {
            module: request.module,
            token: request.token,
            definition: serde_json::json!({ "stale": false }),
        })
        .unwrap();
    registry.drain_inbound(&mut payload_rx);
    assert!(registry.is_ready());
    let table = registry.import("ui/console");
    assert_eq!(table.borrow().get("stale"), Some(&Value::from(false)));
}

// ---------------------------------------------------------------------------
// Module-provided markup, materialized after the barrier
// ---------------------------------------------------------------------------

#[test]
fn module_payload_drives_materialization() {
    let registry = Registry::new();
    let host = Rc::new(MockHost::new());

    let module = registry.import("ui/banner");
    let built: Rc<RefCell<usize>> = Rc::new(RefCell::new(0));

    {
        let module = module.clone();
        let host = host.clone();
        let built = built.clone();
        registry.ready(move || {
            let markup = match module.borrow().get("markup") {
                Some(Value::String(s)) => s.clone(),
                _ => return,
            };
            let nodes = parse(&markup).unwrap();
            let created = Materializer::new(host.as_ref())
                .materialize(&host.root(), &nodes, None)
                .unwrap();
            *built.borrow_mut() = created.len();
        });
    }
    assert_eq!(*built.borrow(), 0);

    registry.deliver(ModulePayload {
        module: "ui/banner".into(),
        token: SessionToken::default(),
        definition: serde_json::json!({
            "markup": "<Panel id=\"banner\"><Label text=\"welcome\"/></Panel>",
        }),
    });

    assert_eq!(*built.borrow(), 1);
    let banner = find_by_id(&host.root(), "banner");
    assert_eq!(banner.children().len(), 1);
}

// ---------------------------------------------------------------------------
// Configuration overlays through the structural merge
// ---------------------------------------------------------------------------

#[test]
fn capability_tables_compose_with_merge() {
    use trellis_ui::merge::merge_all;

    let defaults = Value::table_of([
        ("width", Value::from(1000)),
        (
            "colors",
            Value::table_of([("text", Value::from("#8590a3")), ("glow", Value::from("#dce1ea"))]),
        ),
    ]);
    let user = Value::table_of([(
        "colors",
        Value::table_of([("text", Value::from("#ffffff"))]),
    )]);

    let merged = merge_all(defaults, [user]);
    assert_eq!(merged.get("width"), Some(Value::from(1000)));
    assert_eq!(
        merged.get_path(&["colors", "text"]),
        Some(Value::from("#ffffff"))
    );
    assert_eq!(
        merged.get_path(&["colors", "glow"]),
        Some(Value::from("#dce1ea"))
    );
}
