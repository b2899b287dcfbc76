use sonda::{
    Endpoint, Expect, HarnessConfig, LoadJob, PayloadTemplate, Probe, Reporter, Scenario,
    ScenarioStep, StdoutReporter, TestPlan, TypeCandidates,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // The user service from the local deployment; markers and the
    // discriminator field name ride along in the config.
    let harness = HarnessConfig::new("http://localhost:10010").build()?;

    let register = ScenarioStep::new(
        "register",
        Endpoint::post("/api/RegisterUserMessage"),
        // Deployments have disagreed about this spelling before.
        TypeCandidates::new([
            "RegisterUserMessage",
            "RegisterUser",
            "registerUser",
            "register_user",
        ])?,
    )
    .payload(|_| {
        PayloadTemplate::new()
            .field("username", "probe_user_1")
            .field("passwordHash", "482c811da5d5b4bc6d497ffa98491e38")
            .field("email", "probe_user_1@test.com")
            .field("phoneNumber", "1234567890")
    })
    // Registration answers the new user ID as a bare scalar.
    .extract("userID", "");

    let get_info = ScenarioStep::new(
        "get info",
        Endpoint::post("/api/GetUserInfo"),
        TypeCandidates::new(["GetUserInfoMessage", "GetUserInfo", "getUserInfo"])?,
    )
    .payload(|values| PayloadTemplate::new().field("userID", values.value("userID")));

    let wrong_login = ScenarioStep::new(
        "wrong credentials are refused",
        Endpoint::post("/api/LoginUser"),
        TypeCandidates::new(["LoginUserMessage", "LoginUser"])?,
    )
    .payload(|_| {
        PayloadTemplate::new()
            .field("username", "nonexistent_user_12345")
            .field("passwordHash", "wrong_hash_67890")
    })
    .expect(Expect::Rejected { body_contains: None });

    let register_storm = LoadJob::new("register storm", 10, 0.7, |worker| {
        Probe::builder()
            .endpoint(Endpoint::post("/api/RegisterUserMessage"))
            .candidates(TypeCandidates::single("RegisterUser"))
            .template(
                PayloadTemplate::new()
                    .field("username", format!("load_user_{worker}"))
                    .field("passwordHash", "482c811da5d5b4bc6d497ffa98491e38")
                    .field("email", format!("load_user_{worker}@test.com"))
                    .field("phoneNumber", format!("555000{worker:04}")),
            )
            .build()
            .into()
    });

    let plan = TestPlan::new("user service")
        .preflight(Endpoint::post("/api/LoginUser"))
        .scenario(
            Scenario::new("register then fetch")
                .step(register)
                .step(get_info)
                .step(wrong_login),
        )
        .load_job(register_storm);

    let report = plan.run(&harness).await;
    StdoutReporter.report(report.clone()).await?;
    std::process::exit(report.exit_code());
}
