//! End-to-end plan runs over the stub transport: candidate discovery,
//! chained extraction, load verdicts, and report shape, all offline.

use std::sync::Arc;

use serde_json::json;
use sonda::testkit::{StubReply, StubTransport};
use sonda::{
    Endpoint, Expect, Harness, LoadJob, OutcomeKind, PayloadTemplate, PlanReport, Probe,
    Scenario, ScenarioStep, TestPlan, TypeCandidates,
};

fn candidates(tags: &[&str]) -> TypeCandidates {
    TypeCandidates::new(tags.to_vec()).expect("non-empty candidate list")
}

/// A stub wired like the observed user service: registration only
/// understands the short spelling and answers the user ID as a bare
/// scalar; everything unscripted rejects with the Unknown-type marker.
fn user_service_stub() -> StubTransport {
    StubTransport::new()
        .reply(
            "/api/RegisterUserMessage",
            "RegisterUser",
            StubReply::ok("\"u-42\""),
        )
        .reply(
            "/api/GetUserInfo",
            "GetUserInfoMessage",
            StubReply::ok(json!({"userID": "u-42", "username": "probe_user"}).to_string()),
        )
        .reply(
            "/api/LoginUser",
            "LoginUserMessage",
            StubReply::status(400, "invalid credentials"),
        )
}

#[tokio::test]
async fn full_plan_discovers_tags_chains_values_and_passes() {
    let stub = Arc::new(user_service_stub());
    let harness = Harness::new(stub.clone());

    let register = ScenarioStep::new(
        "register",
        Endpoint::post("/api/RegisterUserMessage"),
        candidates(&["RegisterUserMessage", "RegisterUser", "registerUser"]),
    )
    .payload(|_| PayloadTemplate::new().field("username", "probe_user"))
    .extract("userID", "");

    let get_info = ScenarioStep::new(
        "get info",
        Endpoint::post("/api/GetUserInfo"),
        candidates(&["GetUserInfoMessage", "GetUserInfo"]),
    )
    .payload(|values| PayloadTemplate::new().field("userID", values.value("userID")));

    let wrong_login = ScenarioStep::new(
        "wrong password is refused",
        Endpoint::post("/api/LoginUser"),
        candidates(&["LoginUserMessage", "LoginUser"]),
    )
    .payload(|_| {
        PayloadTemplate::new()
            .field("username", "nonexistent_user")
            .field("passwordHash", "wrong_hash")
    })
    .expect(Expect::Rejected {
        body_contains: Some("invalid credentials".to_string()),
    });

    let report = TestPlan::new("user service conformance")
        .scenario(
            Scenario::new("register then fetch")
                .step(register)
                .step(get_info)
                .step(wrong_login),
        )
        .run(&harness)
        .await;

    assert!(report.passed(), "report: {report:?}");
    assert_eq!(report.exit_code(), 0);

    let scenario = &report.scenarios[0];
    assert_eq!(scenario.completed.len(), 3);
    // The discovered spelling, not the first guess.
    assert_eq!(scenario.completed[0].tag, "RegisterUser");
    // Two candidates burned on discovery, then one per later step.
    assert_eq!(stub.calls("/api/RegisterUserMessage"), 2);
    assert_eq!(stub.calls("/api/GetUserInfo"), 1);

    // The chained value was the one the stub handed out.
    let sent = stub.sent();
    let info_request = sent.iter().find(|r| r.path == "/api/GetUserInfo").unwrap();
    assert_eq!(info_request.payload["userID"], "u-42");
}

#[tokio::test]
async fn a_plan_with_a_failing_load_job_exits_non_zero() {
    // 6 of 10 draws succeed; the rest hit contention.
    let mut stub = StubTransport::new();
    for _ in 0..6 {
        stub = stub.reply("/api/DrawCard", "DrawCardMessage", StubReply::ok("{}"));
    }
    for _ in 0..4 {
        stub = stub.reply(
            "/api/DrawCard",
            "DrawCardMessage",
            StubReply::status(409, "draw contention"),
        );
    }
    let harness = Harness::new(Arc::new(stub));

    let job = LoadJob::new("concurrent draws", 10, 0.7, |worker| {
        Probe::builder()
            .endpoint(Endpoint::post("/api/DrawCard"))
            .candidates(TypeCandidates::single("DrawCardMessage"))
            .template(
                PayloadTemplate::new().field("userID", format!("concurrent-user-{worker}")),
            )
            .build()
            .into()
    });

    let report = TestPlan::new("card service load").load_job(job).run(&harness).await;

    assert!(!report.passed());
    assert_eq!(report.exit_code(), 1);

    let load = &report.load_jobs[0];
    assert_eq!(load.tally.total, 10);
    assert_eq!(load.tally.accepted, 6);
    assert_eq!(load.tally.rejected, 4);
    assert!((load.success_rate - 0.6).abs() < f64::EPSILON);
}

#[tokio::test]
async fn load_over_a_scenario_gives_each_execution_its_own_identity() {
    // Any RegisterUser tag is accepted; GetUserInfo echoes an object.
    let stub = Arc::new(
        StubTransport::new()
            .reply("/api/RegisterUserMessage", "RegisterUser", StubReply::ok("\"u-1\""))
            .reply(
                "/api/GetUserInfo",
                "GetUserInfoMessage",
                StubReply::ok(json!({"ok": true}).to_string()),
            ),
    );
    let harness = Harness::new(stub.clone());

    let job = LoadJob::new("register storm", 5, 1.0, |worker| {
        Scenario::new(format!("register {worker}"))
            .step(
                ScenarioStep::new(
                    "register",
                    Endpoint::post("/api/RegisterUserMessage"),
                    TypeCandidates::single("RegisterUser"),
                )
                .payload(move |_| {
                    PayloadTemplate::new().field("username", format!("load_user_{worker}"))
                })
                .extract("userID", ""),
            )
            .step(
                ScenarioStep::new(
                    "get info",
                    Endpoint::post("/api/GetUserInfo"),
                    TypeCandidates::single("GetUserInfoMessage"),
                )
                .payload(|values| {
                    PayloadTemplate::new().field("userID", values.value("userID"))
                }),
            )
            .into()
    });

    let report = TestPlan::new("user load").load_job(job).run(&harness).await;
    assert!(report.passed());

    let load = &report.load_jobs[0];
    assert_eq!(load.tally.accepted, 5);
    assert!(load.tally.records.iter().all(|r| r.kind == OutcomeKind::Accepted));

    // Five distinct synthetic identities registered.
    let mut names: Vec<String> = stub
        .sent()
        .iter()
        .filter(|r| r.path == "/api/RegisterUserMessage")
        .map(|r| r.payload["username"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 5);
}

#[tokio::test]
async fn reports_serialize_for_machine_consumers() {
    let stub = Arc::new(StubTransport::new().reply("/api/Ping", "Ping", StubReply::ok("{}")));
    let harness = Harness::new(stub);

    let report = TestPlan::new("roundtrip")
        .scenario(Scenario::new("ping").step(ScenarioStep::new(
            "ping",
            Endpoint::post("/api/Ping"),
            TypeCandidates::single("Ping"),
        )))
        .run(&harness)
        .await;

    let json = serde_json::to_string(&report).unwrap();
    let back: PlanReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back, report);
    assert!(back.passed());
}
