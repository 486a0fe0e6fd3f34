use std::path::Path;

use scribe_stack::{
    composer::{
        AuthorizerDeclaration, ComputeUnitDeclaration, RouteAuth, RouteDeclaration,
        StackComposer, StackDeclarations, TriggerDeclaration, TriggerEvent,
    },
    config::Config,
    error::ComposeErrorKind,
    grants::Capability,
    routes::RouteNodeState,
    secrets::SecretValues,
    types::HttpMethod,
};

use crate::fixtures::{csv_bucket, environment, report_table, user_pool};

fn composer() -> StackComposer {
    StackComposer::new(environment())
}

fn report_declarations() -> StackDeclarations {
    StackDeclarations {
        tables: vec![report_table()],
        compute_units: vec![
            ComputeUnitDeclaration::new("CreateReport", "bin/lambdas/post-create-report")
                .depends_on("ReportTable", [Capability::WriteOnly], "REPORT_TABLE"),
        ],
        routes: vec![RouteDeclaration::new(
            "reports/create",
            HttpMethod::Post,
            "CreateReport",
            RouteAuth::None,
        )],
        ..StackDeclarations::default()
    }
}

fn authenticated_declarations() -> StackDeclarations {
    StackDeclarations {
        tables: vec![report_table()],
        buckets: vec![csv_bucket()],
        identity_pools: vec![user_pool()],
        compute_units: vec![
            ComputeUnitDeclaration::new("GetReportByID", "bin/lambdas/get-report-by-id")
                .depends_on("ReportTable", [Capability::ReadOnly], "REPORT_TABLE"),
            ComputeUnitDeclaration::new("AddPart", "bin/lambdas/post-add-part")
                .depends_on("ReportTable", [Capability::ReadWrite], "REPORT_TABLE"),
            ComputeUnitDeclaration::new("ProcessCsv", "bin/lambdas/process-csv")
                .depends_on("CsvBucket", [Capability::ReadOnly], "CSV_BUCKET_NAME")
                .depends_on("ReportTable", [Capability::WriteOnly], "REPORT_TABLE"),
            ComputeUnitDeclaration::new("PostConfirmation", "bin/lambdas/post-confirmation")
                .depends_on(
                    "UserPool",
                    [Capability::AdminAction("AdminGetUser".to_string())],
                    "USER_POOL_ID",
                ),
        ],
        triggers: vec![
            TriggerDeclaration {
                source: "UserPool".to_string(),
                event: TriggerEvent::PostConfirmation,
                compute_unit: "PostConfirmation".to_string(),
            },
            TriggerDeclaration {
                source: "CsvBucket".to_string(),
                event: TriggerEvent::ObjectCreated,
                compute_unit: "ProcessCsv".to_string(),
            },
        ],
        authorizer: Some(AuthorizerDeclaration {
            name: "CognitoAuthorizer".to_string(),
            identity_pool: "UserPool".to_string(),
            identity_source: "Authorization".to_string(),
        }),
        routes: vec![
            RouteDeclaration::new(
                "reports/get",
                HttpMethod::Get,
                "GetReportByID",
                RouteAuth::Authorizer,
            )
            .requiring("reportID"),
            RouteDeclaration::new(
                "reports/parts/add",
                HttpMethod::Post,
                "AddPart",
                RouteAuth::Authorizer,
            ),
            RouteDeclaration::new(
                "reports/parts/sections",
                HttpMethod::Post,
                "AddPart",
                RouteAuth::None,
            ),
        ],
        ..StackDeclarations::default()
    }
}

#[test]
fn given_write_only_dependency_when_composed_then_descriptor_carries_identifier_and_grant() {
    let stack = composer()
        .compose(&report_declarations(), &SecretValues::new())
        .expect("stack should compose");

    let table = stack.resource("ReportTable").expect("table should be emitted");
    let unit = stack
        .compute_unit("CreateReport")
        .expect("unit should be emitted");
    assert_eq!(
        unit.env("REPORT_TABLE").and_then(|value| value.plain_value()),
        Some(table.external_identifier.as_str())
    );
    let grant = unit.grant_on("ReportTable").expect("grant should be recorded");
    assert_eq!(grant.capabilities(), vec![Capability::WriteOnly]);
    assert_eq!(stack.grants_on("ReportTable").count(), 1);
}

#[test]
fn given_unauthenticated_route_when_composed_then_single_binding_without_auth() {
    let stack = composer()
        .compose(&report_declarations(), &SecretValues::new())
        .expect("stack should compose");

    let node = stack
        .routes()
        .find(&["reports", "create"])
        .expect("route node should exist");
    assert_eq!(node.methods.len(), 1);
    assert_eq!(node.methods[0].method, HttpMethod::Post);
    assert_eq!(node.methods[0].target, "CreateReport");
    assert!(node.methods[0].auth.is_none());
    assert!(stack.routes().authorizer().is_none());
}

#[test]
fn given_undeclared_resource_dependency_when_composed_then_dangling_reference_names_it() {
    let mut declarations = report_declarations();
    declarations.compute_units.push(
        ComputeUnitDeclaration::new("CreateTemplate", "bin/lambdas/post-create-template")
            .depends_on("TemplateTable", [Capability::WriteOnly], "TEMPLATE_TABLE"),
    );

    let err = composer()
        .compose(&declarations, &SecretValues::new())
        .expect_err("undeclared resource must fail");
    assert_eq!(err.kind, ComposeErrorKind::DanglingReference);
    assert!(err.names("TemplateTable"));
    assert!(err.names("CreateTemplate"));
}

#[test]
fn given_route_to_unbuilt_unit_when_composed_then_dangling_reference_names_it() {
    let mut declarations = report_declarations();
    declarations.routes.push(RouteDeclaration::new(
        "reports/all",
        HttpMethod::Get,
        "GetAllReports",
        RouteAuth::None,
    ));

    let err = composer()
        .compose(&declarations, &SecretValues::new())
        .expect_err("route to unknown unit must fail");
    assert_eq!(err.kind, ComposeErrorKind::DanglingReference);
    assert!(err.names("GetAllReports"));
}

#[test]
fn given_authenticated_route_without_authorizer_when_composed_then_dangling_reference() {
    let mut declarations = report_declarations();
    declarations.routes[0].auth = RouteAuth::Authorizer;

    let err = composer()
        .compose(&declarations, &SecretValues::new())
        .expect_err("authorizer must be declared");
    assert_eq!(err.kind, ComposeErrorKind::DanglingReference);
    assert!(err.names("authorizer"));
}

#[test]
fn given_empty_capability_dependency_when_composed_then_ungranted_configuration() {
    let mut declarations = report_declarations();
    declarations.compute_units.push(
        ComputeUnitDeclaration::new("GetAllReports", "bin/lambdas/get-all-reports").depends_on(
            "ReportTable",
            Vec::<Capability>::new(),
            "REPORT_TABLE",
        ),
    );

    let err = composer()
        .compose(&declarations, &SecretValues::new())
        .expect_err("configuration without permission must fail");
    assert_eq!(err.kind, ComposeErrorKind::UngrantedConfiguration);
    assert!(err.names("GetAllReports"));
    assert!(err.names("REPORT_TABLE"));
}

#[test]
fn given_unprovisioned_secret_when_composed_then_missing_secret() {
    let mut declarations = report_declarations();
    declarations.compute_units.push(
        ComputeUnitDeclaration::new("GenerateSection", "bin/lambdas/post-generate-section")
            .depends_on("ReportTable", [Capability::ReadWrite], "REPORT_TABLE")
            .binds_secret("openai-key", "OPENAI_API_KEY"),
    );

    let err = composer()
        .compose(&declarations, &SecretValues::new())
        .expect_err("secret must exist before binding");
    assert_eq!(err.kind, ComposeErrorKind::MissingSecret);
    assert!(err.names("openai-key"));

    let stack = composer()
        .compose(
            &declarations,
            &SecretValues::new().with("openai-key", "sk-test"),
        )
        .expect("stack should compose once the secret exists");
    let snapshot = stack.to_json_pretty().expect("snapshot should serialize");
    assert!(!snapshot.contains("sk-test"));
}

#[test]
fn given_same_declarations_when_composed_twice_then_snapshots_are_identical() {
    let declarations = authenticated_declarations();
    let first = composer()
        .compose(&declarations, &SecretValues::new())
        .expect("stack should compose");
    let second = composer()
        .compose(&declarations, &SecretValues::new())
        .expect("stack should compose");

    assert_eq!(first, second);
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert!(first.fingerprint().starts_with("stk:"));
}

#[test]
fn given_reordered_independent_declarations_when_composed_then_grants_and_environment_match() {
    let declarations = authenticated_declarations();
    let mut reordered = declarations.clone();
    reordered.compute_units.reverse();
    reordered.triggers.reverse();
    reordered.tables.reverse();
    reordered.buckets.reverse();

    let original = composer()
        .compose(&declarations, &SecretValues::new())
        .expect("stack should compose");
    let shuffled = composer()
        .compose(&reordered, &SecretValues::new())
        .expect("stack should compose");

    assert_eq!(original.grants(), shuffled.grants());
    assert_eq!(original.compute_units(), shuffled.compute_units());
    assert_eq!(original.triggers(), shuffled.triggers());
    assert_eq!(original.fingerprint(), shuffled.fingerprint());
}

#[test]
fn given_shared_prefix_routes_when_composed_then_one_reports_node_with_distinct_children() {
    let stack = composer()
        .compose(&authenticated_declarations(), &SecretValues::new())
        .expect("stack should compose");

    let root = stack.routes().root();
    assert_eq!(
        root.children
            .iter()
            .filter(|child| child.segment == "reports")
            .count(),
        1
    );
    let reports = stack
        .routes()
        .find(&["reports"])
        .expect("reports node should exist");
    let segments = reports
        .children
        .iter()
        .map(|child| child.segment.as_str())
        .collect::<Vec<_>>();
    assert_eq!(segments, vec!["get", "parts"]);
    assert_eq!(reports.state(), RouteNodeState::PartiallyBound);

    let parts = stack
        .routes()
        .find(&["reports", "parts"])
        .expect("parts node should exist");
    let segments = parts
        .children
        .iter()
        .map(|child| child.segment.as_str())
        .collect::<Vec<_>>();
    assert_eq!(segments, vec!["add", "sections"]);
}

#[test]
fn given_authorizer_when_composed_then_authenticated_routes_share_it() {
    let stack = composer()
        .compose(&authenticated_declarations(), &SecretValues::new())
        .expect("stack should compose");

    let authorizer = stack
        .routes()
        .authorizer()
        .expect("authorizer should be attached");
    assert_eq!(authorizer.identity_source, "Authorization");
    assert_eq!(
        authorizer.identity_pool_arn,
        stack.resource("UserPool").expect("pool should exist").arn
    );

    let get = stack
        .routes()
        .binding(&["reports", "get"], HttpMethod::Get)
        .expect("binding should exist");
    assert!(get.is_authenticated());
    assert!(get.required_query_params.contains("reportID"));

    let sections = stack
        .routes()
        .binding(&["reports", "parts", "sections"], HttpMethod::Post)
        .expect("binding should exist");
    assert!(!sections.is_authenticated());
}

#[test]
fn given_authorizer_without_authenticated_routes_when_composed_then_snapshot_keeps_it() {
    let mut declarations = authenticated_declarations();
    for route in &mut declarations.routes {
        route.auth = RouteAuth::None;
    }

    let stack = composer()
        .compose(&declarations, &SecretValues::new())
        .expect("stack should compose");

    assert!(stack.routes().authorizer().is_none());
    let authorizer = stack.authorizer().expect("declared authorizer is emitted");
    assert_eq!(authorizer.name, "CognitoAuthorizer");
    assert_eq!(authorizer.identity_pool, "UserPool");
}

#[test]
fn given_authorizer_when_serialized_then_definition_appears_once_and_routes_reference_it() {
    let stack = composer()
        .compose(&authenticated_declarations(), &SecretValues::new())
        .expect("stack should compose");

    let rendered = serde_json::to_value(&stack).expect("stack should serialize");
    assert_eq!(rendered["authorizer"]["name"], "CognitoAuthorizer");
    assert_eq!(rendered["authorizer"]["identity_source"], "Authorization");
    assert_eq!(rendered["routes"]["authorizer"], "CognitoAuthorizer");
    assert!(
        stack
            .routes()
            .authorizer()
            .zip(stack.authorizer())
            .is_some_and(|(tree, snapshot)| std::sync::Arc::ptr_eq(tree, snapshot))
    );
}

#[test]
fn given_triggers_when_composed_then_bindings_are_sorted_and_outputs_exposed() {
    let stack = composer()
        .compose(&authenticated_declarations(), &SecretValues::new())
        .expect("stack should compose");

    let triggers = stack
        .triggers()
        .iter()
        .map(|trigger| (trigger.source.as_str(), trigger.event, trigger.target.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        triggers,
        vec![
            ("CsvBucket", TriggerEvent::ObjectCreated, "ProcessCsv"),
            ("UserPool", TriggerEvent::PostConfirmation, "PostConfirmation"),
        ]
    );

    assert_eq!(stack.output("CsvBucket.name"), Some("scribe-csv-bucket"));
    assert_eq!(
        stack.output("UserPool.identifier"),
        Some("us-east-1_data-scribe-UserPool")
    );
    assert_eq!(
        stack.output("UserPool.DataScribeClient.client_name"),
        Some("DataScribeClient")
    );
    assert!(stack.output("UserPool.DataScribeClient.client_id").is_none());
    assert_eq!(stack.output("gateway.name"), Some("Gateway"));
}

#[test]
fn given_trigger_on_wrong_resource_kind_when_composed_then_unknown_resource_kind() {
    let mut declarations = authenticated_declarations();
    declarations.triggers.push(TriggerDeclaration {
        source: "ReportTable".to_string(),
        event: TriggerEvent::ObjectCreated,
        compute_unit: "ProcessCsv".to_string(),
    });

    let err = composer()
        .compose(&declarations, &SecretValues::new())
        .expect_err("tables do not emit object events");
    assert_eq!(err.kind, ComposeErrorKind::UnknownResourceKind);
    assert!(err.names("ReportTable"));
}

#[test]
fn given_trigger_to_unknown_unit_when_composed_then_dangling_reference() {
    let mut declarations = authenticated_declarations();
    declarations.triggers[0].compute_unit = "WelcomeUser".to_string();

    let err = composer()
        .compose(&declarations, &SecretValues::new())
        .expect_err("trigger target must exist");
    assert_eq!(err.kind, ComposeErrorKind::DanglingReference);
    assert!(err.names("WelcomeUser"));
}

#[test]
fn given_authorizer_on_table_when_composed_then_unknown_resource_kind() {
    let mut declarations = authenticated_declarations();
    if let Some(authorizer) = declarations.authorizer.as_mut() {
        authorizer.identity_pool = "ReportTable".to_string();
    }

    let err = composer()
        .compose(&declarations, &SecretValues::new())
        .expect_err("authorizer needs an identity pool");
    assert_eq!(err.kind, ComposeErrorKind::UnknownResourceKind);
}

#[test]
fn given_repeated_unit_name_when_composed_then_invalid_declaration() {
    let mut declarations = report_declarations();
    declarations.compute_units.push(ComputeUnitDeclaration::new(
        "CreateReport",
        "bin/lambdas/other",
    ));

    let err = composer()
        .compose(&declarations, &SecretValues::new())
        .expect_err("unit names are unique");
    assert_eq!(err.kind, ComposeErrorKind::InvalidDeclaration);
    assert!(err.names("CreateReport"));
}

#[test]
fn given_sample_config_when_composed_then_full_backend_is_wired() {
    let config_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("scribe-stack.jsonc");
    let config = Config::load(&config_path).expect("sample config should load");
    let secrets = SecretValues::new().with("openai-key", "sk-test");

    let stack = StackComposer::new(config.environment.clone())
        .compose(&config.stack, &secrets)
        .expect("sample stack should compose");

    assert_eq!(stack.resources().len(), 6);
    assert_eq!(stack.compute_units().len(), 14);
    assert_eq!(stack.grants().len(), 20);
    assert_eq!(stack.triggers().len(), 2);
    assert_eq!(stack.routes().entries().len(), 16);
    assert!(
        stack
            .routes()
            .entries()
            .iter()
            .all(|(_, binding)| binding.is_authenticated())
    );

    let generate = stack
        .compute_unit("GenerateSection")
        .expect("unit should exist");
    assert_eq!(generate.limits.memory_mb, 2048);
    assert_eq!(generate.limits.timeout_secs, Some(150));

    let operations = stack
        .compute_unit("ProcessCsv")
        .and_then(|unit| unit.env("OPERATION_TABLE"))
        .and_then(|value| value.plain_value());
    assert_eq!(operations, Some("data-scribe-OperationsTable"));
    assert_eq!(stack.output("gateway.name"), Some("DataScribeGateway"));
}
