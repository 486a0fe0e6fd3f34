use scribe_stack::{
    error::ComposeErrorKind,
    grants::{Capability, CapabilityGrantEngine},
};

use crate::fixtures::{csv_bucket, registry, report_table, user_pool};

fn admin(action: &str) -> Capability {
    Capability::AdminAction(action.to_string())
}

#[test]
fn given_read_then_write_when_granted_then_edge_holds_read_write() {
    let mut registry = registry();
    let table = registry
        .declare_table(report_table())
        .expect("table should declare");
    let mut engine = CapabilityGrantEngine::new();

    let first = engine
        .grant(&table, "AddPart", [Capability::ReadOnly])
        .expect("read grant should succeed");
    assert!(first.changed);
    assert_eq!(first.exports.external_identifier, table.external_identifier);

    let second = engine
        .grant(&table, "AddPart", [Capability::WriteOnly])
        .expect("write grant should succeed");
    assert!(second.changed);
    assert_eq!(second.capabilities.capabilities(), vec![Capability::ReadWrite]);
    assert_eq!(engine.len(), 1, "one statement per (resource, consumer)");
}

#[test]
fn given_same_grant_twice_when_granted_then_second_is_a_no_op() {
    let mut registry = registry();
    let table = registry
        .declare_table(report_table())
        .expect("table should declare");
    let mut engine = CapabilityGrantEngine::new();

    engine
        .grant(&table, "GetReportByID", [Capability::ReadOnly])
        .expect("grant should succeed");
    let before = engine.statements().cloned().collect::<Vec<_>>();
    let repeat = engine
        .grant(&table, "GetReportByID", [Capability::ReadOnly])
        .expect("repeat grant should succeed");

    assert!(!repeat.changed);
    assert_eq!(engine.statements().cloned().collect::<Vec<_>>(), before);
}

#[test]
fn given_grants_in_either_order_when_collected_then_statements_match() {
    let mut registry = registry();
    let table = registry
        .declare_table(report_table())
        .expect("table should declare");
    let bucket = registry
        .declare_bucket(csv_bucket())
        .expect("bucket should declare");

    let mut forward = CapabilityGrantEngine::new();
    forward
        .grant(&table, "ProcessCsv", [Capability::WriteOnly])
        .expect("grant should succeed");
    forward
        .grant(&bucket, "ProcessCsv", [Capability::ReadOnly])
        .expect("grant should succeed");
    forward
        .grant(&table, "ProcessCsv", [Capability::ReadOnly])
        .expect("grant should succeed");

    let mut backward = CapabilityGrantEngine::new();
    backward
        .grant(&table, "ProcessCsv", [Capability::ReadWrite])
        .expect("grant should succeed");
    backward
        .grant(&bucket, "ProcessCsv", [Capability::ReadOnly])
        .expect("grant should succeed");

    assert_eq!(forward.into_statements(), backward.into_statements());
}

#[test]
fn given_admin_action_on_table_when_granted_then_unknown_resource_kind() {
    let mut registry = registry();
    let table = registry
        .declare_table(report_table())
        .expect("table should declare");
    let mut engine = CapabilityGrantEngine::new();

    let err = engine
        .grant(&table, "GetAllUsers", [admin("ListUsers")])
        .expect_err("admin actions only apply to identity pools");
    assert_eq!(err.kind, ComposeErrorKind::UnknownResourceKind);
    assert!(err.names("GetAllUsers"));
    assert!(engine.is_empty());
}

#[test]
fn given_admin_actions_on_pool_when_granted_then_statement_lists_each_action() {
    let mut registry = registry();
    let pool = registry
        .declare_identity_pool(user_pool())
        .expect("pool should declare");
    let mut engine = CapabilityGrantEngine::new();

    engine
        .grant(&pool, "PostConfirmation", [admin("AdminGetUser")])
        .expect("grant should succeed");
    engine
        .grant(&pool, "PostConfirmation", [admin("AdminDisableUser")])
        .expect("grant should succeed");

    let attached = engine.attached_consumers("UserPool");
    assert_eq!(attached.len(), 1);
    assert_eq!(
        attached[0].statement.actions,
        vec![
            "cognito-idp:AdminDisableUser".to_string(),
            "cognito-idp:AdminGetUser".to_string(),
        ]
    );
    assert_eq!(attached[0].statement.resources, vec![pool.arn.clone()]);
}

#[test]
fn given_empty_capability_set_when_granted_then_no_edge_is_recorded() {
    let mut registry = registry();
    let table = registry
        .declare_table(report_table())
        .expect("table should declare");
    let mut engine = CapabilityGrantEngine::new();

    let result = engine
        .grant(&table, "GetUserID", Vec::<Capability>::new())
        .expect("empty grant is accepted");
    assert!(!result.changed);
    assert!(result.capabilities.is_empty());
    assert!(engine.granted("ReportTable", "GetUserID").is_none());
}
