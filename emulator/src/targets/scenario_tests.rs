//! End-to-end target tests covering the scenarios named in §8 TESTABLE
//! PROPERTIES: sign-up, confirmation, sign-in, refresh, and the PreSignUp
//! auto-confirm/auto-verify path. Exercises the real target structs wired
//! to a temp-dir-backed `DataStoreFactory`, the way a caller hitting the
//! HTTP boundary would, rather than poking `UserPoolService` directly.

use std::sync::Arc;

use fake::faker::internet::en::SafeEmail;
use fake::Fake;
use serde_json::{json, Value};

use crate::clock::SystemClock;
use crate::context::Context;
use crate::domain::UserStatus;
use crate::messages::{LoggingMessageDelivery, Messages};
use crate::otp::OtpGenerator;
use crate::service::CognitoService;
use crate::store::DataStoreFactory;
use crate::targets::support::Deps;
use crate::targets::{attribute_targets, auth_targets, password_targets, pool_targets, signup_targets, user_targets, Target};
use crate::tokens::key_material::KeyMaterial;
use crate::tokens::TokenGenerator;
use crate::triggers::lambda::MockLambda;
use crate::triggers::Triggers;

/// Always returns the same code, matching §8 scenario 2's literal `"1234"`.
struct FixedOtp(&'static str);

impl OtpGenerator for FixedOtp {
    fn generate(&self) -> String {
        self.0.to_string()
    }
}

/// Builds a full `Deps` graph against a fresh temp directory, with no
/// triggers configured unless the caller swaps in its own `MockLambda`.
fn deps_with_lambda(lambda: MockLambda, code: &'static str) -> Arc<Deps> {
    let dir = std::env::temp_dir().join(format!("emulator-scenario-test-{}", uuid::Uuid::new_v4()));
    let store_factory = Arc::new(DataStoreFactory::new(dir));
    let clock = Arc::new(SystemClock);
    let cognito = Arc::new(CognitoService::new(store_factory, clock.clone()));
    let triggers = Arc::new(Triggers::new(Arc::new(lambda)));
    let messages = Arc::new(Messages::new(triggers.clone(), Arc::new(LoggingMessageDelivery)));
    let tokens = Arc::new(TokenGenerator::new(Arc::new(KeyMaterial::generate("test-kid")), clock.clone(), triggers.clone(), 9229));

    Arc::new(Deps {
        cognito,
        triggers,
        messages,
        tokens,
        clock,
        otp: Arc::new(FixedOtp(code)),
    })
}

fn no_triggers_deps() -> Arc<Deps> {
    let mut mock = MockLambda::new();
    mock.expect_is_configured().returning(|_| false);
    deps_with_lambda(mock, "1234")
}

/// Creates a pool (with the given `UsernameAttributes`/`AutoVerifiedAttributes`)
/// and one app client against it, returning `(pool_id, client_id)`.
async fn create_pool_and_client(deps: &Arc<Deps>, ctx: &Context, username_attributes: Value, auto_verified_attributes: Value) -> (String, String) {
    let create_pool = pool_targets::CreateUserPool::new(deps.clone());
    let pool_response = create_pool
        .execute(
            ctx,
            json!({
                "PoolName": "test-pool",
                "UsernameAttributes": username_attributes,
                "AutoVerifiedAttributes": auto_verified_attributes,
            }),
        )
        .await
        .unwrap();
    let pool_id = pool_response["UserPool"]["Id"].as_str().unwrap().to_string();

    let create_client = pool_targets::CreateUserPoolClient::new(deps.clone());
    let client_response = create_client
        .execute(ctx, json!({"UserPoolId": pool_id, "ClientName": "test-client"}))
        .await
        .unwrap();
    let client_id = client_response["UserPoolClient"]["ClientId"].as_str().unwrap().to_string();

    (pool_id, client_id)
}

#[tokio::test]
async fn duplicate_sign_up_fails_with_username_exists() {
    let deps = no_triggers_deps();
    let ctx = Context::new();
    let (_pool_id, client_id) = create_pool_and_client(&deps, &ctx, json!([]), json!([])).await;

    let email: String = SafeEmail().fake();
    let sign_up = signup_targets::SignUp::new(deps.clone());
    let request = json!({
        "ClientId": client_id,
        "Username": "alice",
        "Password": "p",
        "UserAttributes": [{"Name": "email", "Value": email}],
    });

    let first = sign_up.execute(&ctx, request.clone()).await.unwrap();
    assert_eq!(first["UserConfirmed"], json!(false));

    let second_err = sign_up.execute(&ctx, request).await.unwrap_err();
    assert_eq!(second_err.error_name(), "UsernameExistsException");
}

#[tokio::test]
async fn sign_up_confirm_sign_in_flow_issues_password_verifier_tokens() {
    let deps = no_triggers_deps();
    let ctx = Context::new();
    let (_pool_id, client_id) = create_pool_and_client(&deps, &ctx, json!([]), json!(["email"])).await;

    let sign_up = signup_targets::SignUp::new(deps.clone());
    let sign_up_response = sign_up
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "Username": "alice",
                "Password": "p",
                "UserAttributes": [{"Name": "email", "Value": "alice@example.com"}],
            }),
        )
        .await
        .unwrap();
    assert_eq!(sign_up_response["UserConfirmed"], json!(false));
    assert_eq!(
        sign_up_response["CodeDeliveryDetails"]["AttributeName"],
        json!("email")
    );

    let pool = deps.cognito.get_user_pool_for_client_id(&ctx, &client_id).await.unwrap();
    let stored = pool.get_user_by_username(&ctx, "alice").await.unwrap().unwrap();
    assert_eq!(stored.user_status, UserStatus::Unconfirmed);
    assert_eq!(stored.confirmation_code.as_deref(), Some("1234"));

    let confirm = signup_targets::ConfirmSignUp::new(deps.clone());
    confirm
        .execute(&ctx, json!({"ClientId": client_id, "Username": "alice", "ConfirmationCode": "1234"}))
        .await
        .unwrap();

    let confirmed = pool.get_user_by_username(&ctx, "alice").await.unwrap().unwrap();
    assert_eq!(confirmed.user_status, UserStatus::Confirmed);
    assert!(confirmed.confirmation_code.is_none());

    let initiate_auth = auth_targets::InitiateAuth::new(deps.clone());
    let auth_response = initiate_auth
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "AuthFlow": "USER_PASSWORD_AUTH",
                "AuthParameters": {"USERNAME": "alice", "PASSWORD": "p"},
            }),
        )
        .await
        .unwrap();

    let result = &auth_response["AuthenticationResult"];
    assert!(!result["AccessToken"].as_str().unwrap().is_empty());
    assert!(!result["IdToken"].as_str().unwrap().is_empty());
    assert!(!result["RefreshToken"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn wrong_confirmation_code_is_a_code_mismatch_and_leaves_user_unconfirmed() {
    let deps = no_triggers_deps();
    let ctx = Context::new();
    let (_pool_id, client_id) = create_pool_and_client(&deps, &ctx, json!([]), json!(["email"])).await;

    let sign_up = signup_targets::SignUp::new(deps.clone());
    sign_up
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "Username": "alice",
                "Password": "p",
                "UserAttributes": [{"Name": "email", "Value": "alice@example.com"}],
            }),
        )
        .await
        .unwrap();

    let confirm = signup_targets::ConfirmSignUp::new(deps.clone());
    let err = confirm
        .execute(&ctx, json!({"ClientId": client_id, "Username": "alice", "ConfirmationCode": "9999"}))
        .await
        .unwrap_err();
    assert_eq!(err.error_name(), "CodeMismatchException");

    let pool = deps.cognito.get_user_pool_for_client_id(&ctx, &client_id).await.unwrap();
    let user = pool.get_user_by_username(&ctx, "alice").await.unwrap().unwrap();
    assert_eq!(user.user_status, UserStatus::Unconfirmed);
}

#[tokio::test]
async fn confirming_an_already_confirmed_user_is_not_authorized() {
    let deps = no_triggers_deps();
    let ctx = Context::new();
    let (_pool_id, client_id) = create_pool_and_client(&deps, &ctx, json!([]), json!(["email"])).await;

    let sign_up = signup_targets::SignUp::new(deps.clone());
    sign_up
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "Username": "alice",
                "Password": "p",
                "UserAttributes": [{"Name": "email", "Value": "alice@example.com"}],
            }),
        )
        .await
        .unwrap();

    let confirm = signup_targets::ConfirmSignUp::new(deps.clone());
    confirm
        .execute(&ctx, json!({"ClientId": client_id, "Username": "alice", "ConfirmationCode": "1234"}))
        .await
        .unwrap();

    let second_err = confirm
        .execute(&ctx, json!({"ClientId": client_id, "Username": "alice", "ConfirmationCode": "1234"}))
        .await
        .unwrap_err();
    assert_eq!(second_err.error_name(), "NotAuthorizedException");
}

#[tokio::test]
async fn refresh_token_flow_issues_access_and_id_tokens_but_no_new_refresh_token() {
    let deps = no_triggers_deps();
    let ctx = Context::new();
    let (_pool_id, client_id) = create_pool_and_client(&deps, &ctx, json!([]), json!(["email"])).await;

    let sign_up = signup_targets::SignUp::new(deps.clone());
    sign_up
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "Username": "alice",
                "Password": "p",
                "UserAttributes": [{"Name": "email", "Value": "alice@example.com"}],
            }),
        )
        .await
        .unwrap();
    signup_targets::ConfirmSignUp::new(deps.clone())
        .execute(&ctx, json!({"ClientId": client_id, "Username": "alice", "ConfirmationCode": "1234"}))
        .await
        .unwrap();

    let initiate_auth = auth_targets::InitiateAuth::new(deps.clone());
    let auth_response = initiate_auth
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "AuthFlow": "USER_PASSWORD_AUTH",
                "AuthParameters": {"USERNAME": "alice", "PASSWORD": "p"},
            }),
        )
        .await
        .unwrap();
    let refresh_token = auth_response["AuthenticationResult"]["RefreshToken"].as_str().unwrap().to_string();

    let refresh_response = initiate_auth
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "AuthFlow": "REFRESH_TOKEN",
                "AuthParameters": {"REFRESH_TOKEN": refresh_token.clone()},
            }),
        )
        .await
        .unwrap();
    let result = &refresh_response["AuthenticationResult"];
    assert!(!result["AccessToken"].as_str().unwrap().is_empty());
    assert!(!result["IdToken"].as_str().unwrap().is_empty());
    assert!(result.get("RefreshToken").map(Value::is_null).unwrap_or(true));

    // §8 scenario 4: "Same refresh token may be replayed (no revocation
    // semantics in core)."
    let replayed = initiate_auth
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "AuthFlow": "REFRESH_TOKEN",
                "AuthParameters": {"REFRESH_TOKEN": refresh_token},
            }),
        )
        .await;
    assert!(replayed.is_ok());
}

#[tokio::test]
async fn describe_missing_pool_fails_with_resource_not_found() {
    let deps = no_triggers_deps();
    let ctx = Context::new();
    let describe = pool_targets::DescribeUserPool::new(deps.clone());
    let err = describe.execute(&ctx, json!({"UserPoolId": "missing"})).await.unwrap_err();
    assert_eq!(err.error_name(), "ResourceNotFoundException");
    assert_eq!(err.to_string(), "User pool missing does not exist.");
}

#[tokio::test]
async fn pre_sign_up_auto_confirm_and_auto_verify_email_invokes_post_confirmation() {
    let mut lambda = MockLambda::new();
    lambda.expect_is_configured().returning(|trigger| {
        matches!(
            trigger,
            crate::triggers::events::TriggerName::PreSignUp | crate::triggers::events::TriggerName::PostConfirmation
        )
    });
    lambda.expect_invoke().returning(|_ctx, trigger, event| {
        use crate::triggers::events::TriggerName;
        Box::pin(async move {
            match trigger {
                TriggerName::PreSignUp => Ok(json!({
                    "autoConfirmUser": true,
                    "autoVerifyEmail": true,
                    "autoVerifyPhone": false,
                })),
                TriggerName::PostConfirmation => {
                    let user_status = event["request"]["userAttributes"]["cognito:user_status"].as_str().unwrap_or_default();
                    assert_eq!(event["triggerSource"], json!("PostConfirmation_ConfirmSignUp"));
                    assert_eq!(user_status, "CONFIRMED");
                    Ok(json!({}))
                }
                other => panic!("unexpected trigger invoked: {other:?}"),
            }
        })
    });

    let deps = deps_with_lambda(lambda, "1234");
    let ctx = Context::new();
    let (_pool_id, client_id) = create_pool_and_client(&deps, &ctx, json!([]), json!([])).await;

    let sign_up = signup_targets::SignUp::new(deps.clone());
    let response = sign_up
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "Username": "alice",
                "Password": "p",
                "UserAttributes": [{"Name": "email", "Value": "alice@example.com"}],
            }),
        )
        .await
        .unwrap();

    assert_eq!(response["UserConfirmed"], json!(true));

    let pool = deps.cognito.get_user_pool_for_client_id(&ctx, &client_id).await.unwrap();
    let user = pool.get_user_by_username(&ctx, "alice").await.unwrap().unwrap();
    assert_eq!(user.user_status, UserStatus::Confirmed);
    assert_eq!(user.attribute("email_verified").map(|a| a.value.as_str()), Some("true"));
}

#[tokio::test]
async fn admin_create_user_then_admin_get_user_reports_force_change_password() {
    let deps = no_triggers_deps();
    let ctx = Context::new();
    let (pool_id, _client_id) = create_pool_and_client(&deps, &ctx, json!([]), json!([])).await;

    let admin_create = signup_targets::AdminCreateUser::new(deps.clone());
    admin_create
        .execute(
            &ctx,
            json!({
                "UserPoolId": pool_id,
                "Username": "bob",
                "TemporaryPassword": "TempPass1",
            }),
        )
        .await
        .unwrap();

    let admin_get = user_targets::AdminGetUser::new(deps.clone());
    let response = admin_get.execute(&ctx, json!({"UserPoolId": pool_id, "Username": "bob"})).await.unwrap();
    assert_eq!(response["UserStatus"], json!("FORCE_CHANGE_PASSWORD"));
}

#[tokio::test]
async fn update_user_attributes_rejects_immutable_schema_field() {
    let deps = no_triggers_deps();
    let ctx = Context::new();
    let (_pool_id, client_id) = create_pool_and_client(&deps, &ctx, json!([]), json!([])).await;

    let sign_up = signup_targets::SignUp::new(deps.clone());
    let sign_up_response = sign_up
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "Username": "alice",
                "Password": "p",
                "UserAttributes": [{"Name": "email", "Value": "alice@example.com"}],
            }),
        )
        .await
        .unwrap();
    let _ = sign_up_response;

    let update = attribute_targets::UpdateUserAttributes::new(deps.clone());
    let initiate_auth = auth_targets::InitiateAuth::new(deps.clone());
    let pool = deps.cognito.get_user_pool_for_client_id(&ctx, &client_id).await.unwrap();
    let stored = pool.get_user_by_username(&ctx, "alice").await.unwrap().unwrap();
    signup_targets::ConfirmSignUp::new(deps.clone())
        .execute(
            &ctx,
            json!({"ClientId": client_id, "Username": "alice", "ConfirmationCode": stored.confirmation_code.clone().unwrap_or_default()}),
        )
        .await
        .unwrap();

    let auth_response = initiate_auth
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "AuthFlow": "USER_PASSWORD_AUTH",
                "AuthParameters": {"USERNAME": "alice", "PASSWORD": "p"},
            }),
        )
        .await
        .unwrap();
    let access_token = auth_response["AuthenticationResult"]["AccessToken"].as_str().unwrap().to_string();

    let err = update
        .execute(
            &ctx,
            json!({
                "AccessToken": access_token,
                "UserAttributes": [{"Name": "sub", "Value": "forged-sub"}],
            }),
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_name(), "InvalidParameterException");
}

#[tokio::test]
async fn forgot_password_then_confirm_resets_password_and_allows_sign_in() {
    let deps = no_triggers_deps();
    let ctx = Context::new();
    let (_pool_id, client_id) = create_pool_and_client(&deps, &ctx, json!([]), json!(["email"])).await;

    let sign_up = signup_targets::SignUp::new(deps.clone());
    sign_up
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "Username": "alice",
                "Password": "old-pass",
                "UserAttributes": [{"Name": "email", "Value": "alice@example.com"}],
            }),
        )
        .await
        .unwrap();
    signup_targets::ConfirmSignUp::new(deps.clone())
        .execute(&ctx, json!({"ClientId": client_id, "Username": "alice", "ConfirmationCode": "1234"}))
        .await
        .unwrap();

    let forgot_password = password_targets::ForgotPassword::new(deps.clone());
    forgot_password
        .execute(&ctx, json!({"ClientId": client_id, "Username": "alice"}))
        .await
        .unwrap();

    let pool = deps.cognito.get_user_pool_for_client_id(&ctx, &client_id).await.unwrap();
    let mid_reset = pool.get_user_by_username(&ctx, "alice").await.unwrap().unwrap();
    assert_eq!(mid_reset.user_status, UserStatus::ResetRequired);

    let confirm_forgot = password_targets::ConfirmForgotPassword::new(deps.clone());
    confirm_forgot
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "Username": "alice",
                "ConfirmationCode": "1234",
                "Password": "new-pass",
            }),
        )
        .await
        .unwrap();

    let initiate_auth = auth_targets::InitiateAuth::new(deps.clone());
    let wrong_password = initiate_auth
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "AuthFlow": "USER_PASSWORD_AUTH",
                "AuthParameters": {"USERNAME": "alice", "PASSWORD": "old-pass"},
            }),
        )
        .await
        .unwrap_err();
    assert_eq!(wrong_password.error_name(), "InvalidPasswordException");

    let auth_response = initiate_auth
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "AuthFlow": "USER_PASSWORD_AUTH",
                "AuthParameters": {"USERNAME": "alice", "PASSWORD": "new-pass"},
            }),
        )
        .await
        .unwrap();
    assert!(!auth_response["AuthenticationResult"]["AccessToken"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn optional_mfa_with_sms_option_challenges_then_respond_to_challenge_completes_sign_in() {
    let deps = no_triggers_deps();
    let ctx = Context::new();

    let dir_pool = crate::domain::UserPool {
        id: "pool-mfa".to_string(),
        pool_name: Some("mfa-pool".to_string()),
        username_attributes: vec![],
        auto_verified_attributes: vec![],
        mfa_configuration: crate::domain::MfaConfiguration::Optional,
        schema_attributes: crate::domain::user_pool::default_schema_attributes(),
        sms_verification_message: None,
        sms_configuration: None,
        creation_date: deps.clock.now(),
        last_modified_date: deps.clock.now(),
    };
    deps.cognito.create_user_pool(&ctx, dir_pool).await.unwrap();
    let pool = deps.cognito.get_user_pool(&ctx, "pool-mfa").await.unwrap();
    let client = pool.create_app_client(&ctx, "mfa-client").await.unwrap();

    let mut user = crate::domain::User::new(
        "alice",
        "p",
        vec![crate::domain::Attribute::new("phone_number", "+15551234567")],
        UserStatus::Confirmed,
        deps.clock.now(),
    );
    user.mfa_options = vec![crate::domain::MfaOption::sms("phone_number")];
    pool.save_user(&ctx, &user).await.unwrap();

    let initiate_auth = auth_targets::InitiateAuth::new(deps.clone());
    let challenge = initiate_auth
        .execute(
            &ctx,
            json!({
                "ClientId": client.client_id,
                "AuthFlow": "USER_PASSWORD_AUTH",
                "AuthParameters": {"USERNAME": "alice", "PASSWORD": "p"},
            }),
        )
        .await
        .unwrap();
    assert_eq!(challenge["ChallengeName"], json!("SMS_MFA"));

    let stored = pool.get_user_by_username(&ctx, "alice").await.unwrap().unwrap();
    let mfa_code = stored.mfa_code.clone().unwrap();

    let respond = auth_targets::RespondToAuthChallenge::new(deps.clone());
    let wrong_code = respond
        .execute(
            &ctx,
            json!({
                "ClientId": client.client_id,
                "ChallengeName": "SMS_MFA",
                "ChallengeResponses": {"USERNAME": "alice", "SMS_MFA_CODE": "000000"},
            }),
        )
        .await
        .unwrap_err();
    assert_eq!(wrong_code.error_name(), "CodeMismatchException");

    let result = respond
        .execute(
            &ctx,
            json!({
                "ClientId": client.client_id,
                "ChallengeName": "SMS_MFA",
                "ChallengeResponses": {"USERNAME": "alice", "SMS_MFA_CODE": mfa_code},
            }),
        )
        .await
        .unwrap();
    assert!(!result["AuthenticationResult"]["AccessToken"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn revoke_token_removes_it_so_refresh_no_longer_authorizes() {
    let deps = no_triggers_deps();
    let ctx = Context::new();
    let (_pool_id, client_id) = create_pool_and_client(&deps, &ctx, json!([]), json!(["email"])).await;

    let sign_up = signup_targets::SignUp::new(deps.clone());
    sign_up
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "Username": "alice",
                "Password": "p",
                "UserAttributes": [{"Name": "email", "Value": "alice@example.com"}],
            }),
        )
        .await
        .unwrap();
    signup_targets::ConfirmSignUp::new(deps.clone())
        .execute(&ctx, json!({"ClientId": client_id, "Username": "alice", "ConfirmationCode": "1234"}))
        .await
        .unwrap();

    let initiate_auth = auth_targets::InitiateAuth::new(deps.clone());
    let auth_response = initiate_auth
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "AuthFlow": "USER_PASSWORD_AUTH",
                "AuthParameters": {"USERNAME": "alice", "PASSWORD": "p"},
            }),
        )
        .await
        .unwrap();
    let refresh_token = auth_response["AuthenticationResult"]["RefreshToken"].as_str().unwrap().to_string();

    let revoke = user_targets::RevokeToken::new(deps.clone());
    revoke
        .execute(&ctx, json!({"ClientId": client_id, "Token": refresh_token.clone()}))
        .await
        .unwrap();

    let err = initiate_auth
        .execute(
            &ctx,
            json!({
                "ClientId": client_id,
                "AuthFlow": "REFRESH_TOKEN",
                "AuthParameters": {"REFRESH_TOKEN": refresh_token},
            }),
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_name(), "NotAuthorizedException");
}
