//! End-to-end page scenarios: import, layout namespacing and dispatch.

use serde_json::{json, Map, Value};
use std::thread;

use crate::component::Component;
use crate::config::IsolationConfig;
use crate::identifier::{Identifier, StructuredId, Wildcard};
use crate::pages::App;
use crate::response::Patch;
use crate::runtime::{CallbackContext, CallbackError, Invocation, InvocationValue};

fn app() -> App {
    App::new(IsolationConfig::default()).unwrap()
}

fn invocation(output: &str, id: &str, property: &str, value: Value) -> Invocation {
    Invocation {
        output: output.to_string(),
        inputs: vec![InvocationValue {
            id: id.into(),
            property: property.to_string(),
            value,
        }],
        state: Vec::new(),
        changed_prop_ids: vec![format!("{}.{}", id, property)],
    }
}

#[test]
fn test_same_local_id_on_two_pages() {
    let mut app = app();
    let mut bindings = Vec::new();
    for (module, path) in [("pages.a.page", "/a"), ("pages.b.page", "/b")] {
        let mut page = app.register_page(module, path, path).unwrap();
        bindings.push(page.input("value", "value").unwrap());
        page.set_layout(
            Component::html("Div")
                .with_children([
                    Component::core("Input").with_id("value").into_ref(),
                    Component::html("Button").with_id("login-button").into_ref(),
                ])
                .into_ref(),
        );
    }
    app.finish_import().unwrap();

    assert_eq!(bindings[0].id, Identifier::from("pages_a||value"));
    assert_eq!(bindings[1].id, Identifier::from("pages_b||value"));
    assert_ne!(bindings[0].prop_id(), bindings[1].prop_id());
    assert_eq!(app.registry().keys(), vec!["value".to_string()]);

    let a = app.layout_value("/a").unwrap().unwrap();
    let b = app.layout_value("/b").unwrap().unwrap();
    assert_eq!(a["props"]["children"][0]["props"]["id"], json!("pages_a||value"));
    assert_eq!(b["props"]["children"][0]["props"]["id"], json!("pages_b||value"));
    assert_eq!(a["props"]["children"][1]["props"]["id"], json!("login-button"));
}

#[test]
fn test_selection_round_trip() {
    let mut app = app();
    let key = {
        let mut page = app
            .register_page("pages.analytics.page1", "/analytics", "Analytics")
            .unwrap();
        let output = page.output("analytics-output", "children").unwrap();
        let input = page.input("analytics-input", "value").unwrap();
        page.set_layout(
            Component::html("Div")
                .with_children([
                    Component::core("Dropdown")
                        .with_id("analytics-input")
                        .with_prop("options", json!(["NYC", "MTL", "LA"]))
                        .into_ref(),
                    Component::html("Div").with_id("analytics-output").into_ref(),
                ])
                .into_ref(),
        );
        page.callback(vec![output], vec![input], Vec::new(), |ctx, args| {
            assert_eq!(ctx.triggered_id(), Some(Identifier::from("analytics-input")));
            assert_eq!(ctx.triggered_prop_ids(), vec!["analytics-input.value"]);
            let city = args[0].as_str().ok_or(CallbackError::from("expected a city"))?;
            Ok(vec![json!(format!("You selected: {}", city))])
        })
        .unwrap()
    };
    app.finish_import().unwrap();
    assert_eq!(key, "pages_analytics||analytics-output.children");

    let layout = app.layout_value("/analytics").unwrap().unwrap();
    assert_eq!(
        layout["props"]["children"][0]["props"]["id"],
        json!("pages_analytics||analytics-input")
    );

    let payload = app
        .dispatcher()
        .dispatch(&invocation(&key, "pages_analytics||analytics-input", "value", json!("MTL")))
        .unwrap();
    assert_eq!(
        payload,
        json!({
            "multi": true,
            "response": {
                "pages_analytics||analytics-output": { "children": "You selected: MTL" }
            }
        })
    );
}

#[test]
fn test_pattern_matching_append() {
    let mut app = app();
    let key = {
        let mut page = app
            .register_page("pages.pattern_dyn.page", "/pattern", "Pattern")
            .unwrap();
        let container = page.output("dropdown-container-div", "children").unwrap();
        let button = page.input("add-filter", "n_clicks").unwrap();
        let filters = page
            .input(StructuredId::new("filter").with("index", Wildcard::All), "value")
            .unwrap();
        assert_eq!(
            filters.prop_id(),
            r#"{"index":["ALL"],"type":"pages_pattern_dyn||filter"}.value"#
        );

        page.callback(vec![container], vec![button], Vec::new(), |_ctx, args| {
            let clicks = args[0].as_i64().unwrap_or(0);
            let dropdown = Component::core("Dropdown")
                .with_id(StructuredId::new("filter").with("index", clicks))
                .with_prop("options", json!(["NYC", "MTL", "LA", "TOKYO"]))
                .into_ref();
            let mut patch = Patch::new();
            patch.append(dropdown.to_value()?);
            Ok(vec![patch.to_value()])
        })
        .unwrap()
    };
    app.finish_import().unwrap();

    let payload = app
        .dispatcher()
        .dispatch(&invocation(&key, "pages_pattern_dyn||add-filter", "n_clicks", json!(2)))
        .unwrap();
    let op = &payload["response"]["pages_pattern_dyn||dropdown-container-div"]["children"]
        ["operations"][0];
    assert_eq!(op["operation"], json!("Append"));
    assert_eq!(
        op["params"]["value"]["props"]["id"],
        json!({ "type": "pages_pattern_dyn||filter", "index": 2 })
    );
}

#[test]
fn test_out_of_band_prop_set() {
    let mut app = app();
    let key = {
        let mut page = app
            .register_page("pages.clientside.page", "/clientside", "Clientside")
            .unwrap();
        let output = page.output("status", "children").unwrap();
        let input = page.input("button", "n_clicks").unwrap();
        page.callback(
            vec![output],
            vec![input],
            Vec::new(),
            |ctx: &CallbackContext<'_>, _: &[Value]| {
                let mut props = Map::new();
                props.insert("children".to_string(), json!("clicked"));
                ctx.set_props("log", props)?;
                Ok(vec![json!("done")])
            },
        )
        .unwrap()
    };
    app.finish_import().unwrap();

    let payload = app
        .dispatcher()
        .dispatch(&invocation(&key, "pages_clientside||button", "n_clicks", json!(1)))
        .unwrap();
    assert_eq!(payload["response"]["pages_clientside||status"]["children"], json!("done"));
    assert_eq!(
        payload["sideUpdate"],
        json!({ "pages_clientside||log": { "children": "clicked" } })
    );
}

#[test]
fn test_initial_load_sees_no_trigger() {
    let mut app = app();
    let key = {
        let mut page = app.register_page("pages.home.page", "/", "Home").unwrap();
        let output = page.output("greeting", "children").unwrap();
        let location = page.input("url", "pathname").unwrap();
        assert_eq!(location.id, Identifier::from("url"));
        page.callback(vec![output], vec![location], Vec::new(), |ctx, args| {
            assert!(ctx.trigger.is_initial());
            assert!(ctx.triggered_id().is_none());
            Ok(vec![args[0].clone()])
        })
        .unwrap()
    };
    app.finish_import().unwrap();

    let mut request = invocation(&key, "url", "pathname", json!("/"));
    request.changed_prop_ids.clear();
    let payload = app.dispatcher().dispatch(&request).unwrap();
    assert_eq!(payload["response"]["pages_home||greeting"]["children"], json!("/"));
}

#[test]
fn test_concurrent_dispatch() {
    let mut app = app();
    let key = {
        let mut page = app.register_page("pages.echo.page", "/echo", "Echo").unwrap();
        let output = page.output("out", "children").unwrap();
        let input = page.input("in", "value").unwrap();
        page.callback(vec![output], vec![input], Vec::new(), |_ctx, args| {
            Ok(vec![args[0].clone()])
        })
        .unwrap()
    };
    app.finish_import().unwrap();

    let dispatcher = app.dispatcher();
    thread::scope(|scope| {
        for n in 0..8 {
            let key = key.as_str();
            scope.spawn(move || {
                let payload = dispatcher
                    .dispatch(&invocation(key, "pages_echo||in", "value", json!(n)))
                    .unwrap();
                assert_eq!(payload["response"]["pages_echo||out"]["children"], json!(n));
            });
        }
    });
}
