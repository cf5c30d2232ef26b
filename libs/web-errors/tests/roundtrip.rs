#![allow(clippy::unwrap_used, clippy::expect_used)]
//! A failure decorated by one service and translated back by its caller keeps its code.

use std::sync::Arc;

use http::StatusCode;
use web_errors::{
    CodeMap, CodeRegistry, Decorator, ErrorRegistry, Failure, FieldViolation, InboundTranslator,
    InvalidFormat, ProblemDocument, RequestContext, ServiceErrors,
};

fn shared_registry() -> Arc<dyn ErrorRegistry> {
    let registry: Arc<dyn ErrorRegistry> = Arc::new(CodeRegistry::new());
    registry.merge(&[CodeMap::from([
        ("B100".to_owned(), "Order rejected".to_owned()),
        ("E404".to_owned(), "Order".to_owned()),
    ])]);
    registry
}

fn ctx() -> RequestContext {
    RequestContext::new("https://orders.example.com").with_instance("/orders/9")
}

#[test]
fn declared_code_survives_the_wire() {
    let registry = shared_registry();
    let orders = ServiceErrors::new("orders", Arc::clone(&registry));
    let decorator = Decorator::new(Arc::clone(&registry), "orders");

    let err = orders.create_with_message(StatusCode::BAD_REQUEST, "B100", "qty must be > 0");
    let problem = decorator.decorate(err.into(), &ctx());
    let body = serde_json::to_string(&problem).unwrap();

    let translated =
        InboundTranslator::new(registry).translate(problem.status.as_u16(), &body, "gateway");

    assert_eq!(translated.code(), Some("B100"));
    assert_eq!(translated.status(), StatusCode::BAD_REQUEST);
    assert_eq!(translated.problem().title, "Order rejected");
    assert_eq!(translated.problem().detail.as_deref(), Some("qty must be > 0"));
    assert_eq!(
        translated.problem().type_url,
        "https://orders.example.com/errors/B100"
    );
    assert_eq!(translated.problem().instance.as_deref(), Some("/orders/9"));
    assert_eq!(
        translated.problem().properties.service.as_deref(),
        Some("orders")
    );
}

#[test]
fn field_errors_survive_the_wire() {
    let registry = shared_registry();
    let decorator = Decorator::new(Arc::clone(&registry), "users");

    let problem = decorator.decorate(
        Failure::FieldValidation(vec![FieldViolation::new("user", "email", "Email")]),
        &ctx(),
    );
    let body = serde_json::to_string(&problem).unwrap();
    let translated = InboundTranslator::new(registry).translate(404, &body, "gateway");

    assert_eq!(translated.code(), Some("S404"));
    assert_eq!(
        translated.problem().errors(),
        ["object:user, field:email, message:Email"]
    );
}

#[test]
fn translated_failure_can_be_rethrown_with_its_code() {
    let registry = shared_registry();
    let upstream = Decorator::new(Arc::clone(&registry), "users");
    let gateway = Decorator::new(Arc::clone(&registry), "gateway");

    let problem = upstream.decorate(
        InvalidFormat::new("Integer", "abc", "age").into(),
        &ctx(),
    );
    let body = serde_json::to_vec(&problem).unwrap();
    let remote = InboundTranslator::new(registry).translate(
        400,
        std::str::from_utf8(&body).unwrap(),
        "gateway",
    );

    let rethrown = gateway.decorate(
        remote.into(),
        &RequestContext::new("https://gateway.example.com"),
    );
    assert_eq!(rethrown.code(), Some("S401"));
    assert_eq!(rethrown.errors(), ["field:age, value:abc, type:Integer"]);
    assert_eq!(rethrown.type_url, "https://gateway.example.com/errors/S401");
    assert_eq!(rethrown.properties.service.as_deref(), Some("gateway"));
}

#[test]
fn every_decorated_document_is_complete() {
    let decorator = Decorator::new(shared_registry(), "svc");
    let failures = vec![
        Failure::BadRequest(String::new()),
        Failure::NotFound("x".to_owned()),
        Failure::OptimisticLock("v".to_owned()),
        Failure::ConstraintViolation("c".to_owned()),
        Failure::Unreadable {
            message: "m".to_owned(),
            cause: None,
        },
        Failure::Runtime {
            type_name: "IoError".to_owned(),
            message: "disk".to_owned(),
            cause: None,
            cause_message: None,
        },
        Failure::Declared(web_errors::WebError::from_problem(ProblemDocument::new(
            StatusCode::IM_A_TEAPOT,
        ))),
    ];

    for failure in failures {
        let problem = decorator.decorate(failure, &ctx());
        let code = problem.code().unwrap().to_owned();
        assert!(problem.type_url.ends_with(&format!("/errors/{code}")));

        let json = serde_json::to_value(&problem).unwrap();
        assert!(json["properties"]["errors"].is_array());
        assert!(json["properties"]["timestamp"].is_string());
        assert_eq!(json["properties"]["code"], code.as_str());
    }
}
