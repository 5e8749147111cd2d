//! REST surface of the Asiento bookkeeping engine.
//!
//! Submissions answer with `{status: persisted | rejected |
//! awaiting_decision | discarded, ...}`. Held submissions are not kept
//! server side: the client sends its decision back with the draft.

#![deny(unsafe_code)]

pub mod access;
pub mod config;

use std::sync::Arc;

use access::{bearer_token, AccessGuard, StaticTokenGuard};
use asiento_core::{
    AsientoEngine, Classification, DashboardStats, EditOutcome, LedgerError, MovementCorrection, MovementEdit,
    RecurringSummary, ReportError, SubmissionOutcome, TrialBalance, ValidationOutcome,
};
use asiento_storage::{
    LedgerLine, MovementFilter, QueryWindow, StorageError, TransactionFilter,
    TransactionHeaderUpdate,
};
use asiento_types::{
    Account, AccountId, AccountKind, ClassificationRule, Company, CompanyId, Money, MovementId,
    MovementTemplate, NitError, RecurringTemplate, RuleId, TemplateId, ThirdParty, ThirdPartyId,
    Transaction, TransactionDraft, TransactionId,
};
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use config::ServiceConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct ServiceState {
    pub engine: Arc<AsientoEngine>,
    pub guard: Arc<dyn AccessGuard>,
}

impl ServiceState {
    pub fn bootstrap(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let engine = AsientoEngine::open(&config.storage, config.engine.clone())?;
        let guard = StaticTokenGuard::new(config.access.tokens.iter().cloned());
        if guard.is_open() {
            warn!("No access tokens configured, API is open");
        }
        Ok(Self {
            engine: Arc::new(engine),
            guard: Arc::new(guard),
        })
    }
}

pub fn build_router(state: ServiceState) -> Router {
    let api = Router::new()
        .route("/v1/companies", get(list_companies).post(create_company))
        .route("/v1/companies/:id/rules", get(list_rules))
        .route("/v1/companies/:id/trial-balance", get(trial_balance))
        .route("/v1/companies/:id/dashboard", get(dashboard))
        .route("/v1/accounts", get(list_accounts).post(create_account))
        .route("/v1/third-parties", get(list_third_parties).post(create_third_party))
        .route("/v1/rules", post(create_rule))
        .route("/v1/rules/:id", delete(delete_rule))
        .route("/v1/classify", post(classify))
        .route("/v1/transactions", get(list_transactions).post(submit))
        .route("/v1/transactions/validate", post(validate))
        .route("/v1/transactions/force", post(force_save))
        .route("/v1/transactions/corrections", post(apply_corrections))
        .route("/v1/transactions/discard", post(discard))
        .route(
            "/v1/transactions/:id",
            get(get_transaction)
                .patch(update_transaction_header)
                .delete(delete_transaction),
        )
        .route("/v1/transactions/:id/restore", post(restore_transaction))
        .route("/v1/transactions/:id/reverse", post(reverse_transaction))
        .route("/v1/movements", get(list_movements))
        .route("/v1/movements/:id", put(edit_movement))
        .route("/v1/recurring", get(list_recurring).post(create_recurring))
        .route("/v1/recurring/run", post(run_recurring))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/v1/health", get(health))
        .merge(api)
        .with_state(state)
}

async fn require_token(State(state): State<ServiceState>, req: Request, next: Next) -> Response {
    if !state.guard.is_authorized(bearer_token(req.headers())) {
        warn!(path = %req.uri().path(), "Unauthorized request");
        return ApiError::unauthorized().into_response();
    }
    next.run(req).await
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("engine error: {0}")]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Http { status: StatusCode, message: String },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn unauthorized() -> Self {
        Self::Http {
            status: StatusCode::UNAUTHORIZED,
            message: "missing or invalid bearer token".to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Http { status, .. } => *status,
            ApiError::Ledger(err) => match err {
                LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
                LedgerError::Balance(_) => StatusCode::UNPROCESSABLE_ENTITY,
                LedgerError::Correction(_) => StatusCode::BAD_REQUEST,
                LedgerError::Report(ReportError::InvalidPeriod { .. }) => StatusCode::BAD_REQUEST,
                LedgerError::Storage(StorageError::Conflict(_)) => StatusCode::CONFLICT,
                LedgerError::Storage(StorageError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
                LedgerError::Storage(StorageError::InvariantViolation(_)) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                LedgerError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

fn error_code(status: StatusCode) -> &'static str {
    match status {
        StatusCode::NOT_FOUND => "not_found",
        StatusCode::UNPROCESSABLE_ENTITY => "unprocessable",
        StatusCode::CONFLICT => "conflict",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::BAD_REQUEST => "bad_request",
        _ => "internal",
    }
}

impl From<NitError> for ApiError {
    fn from(err: NitError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "Request failed");
        }
        (
            status,
            Json(serde_json::json!({ "error": self.to_string(), "code": error_code(status) })),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "asiento-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
struct ListResponse<T> {
    total: usize,
    items: Vec<T>,
}

impl<T> ListResponse<T> {
    fn new(items: Vec<T>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}

// Reference data

#[derive(Debug, Deserialize)]
struct NewCompany {
    name: String,
    nit: String,
    transaction_prefix: Option<String>,
}

async fn create_company(
    State(state): State<ServiceState>,
    Json(body): Json<NewCompany>,
) -> ApiResult<Company> {
    if body.name.trim().is_empty() {
        return Err(ApiError::bad_request("company name is required"));
    }
    let nit = asiento_types::nit::validate_nit(&body.nit)?;
    let mut company = Company::new(body.name.trim(), nit);
    if let Some(prefix) = body.transaction_prefix.filter(|p| !p.trim().is_empty()) {
        company = company.with_prefix(prefix.trim());
    }
    Ok(Json(state.engine.register_company(company).await?))
}

async fn list_companies(State(state): State<ServiceState>) -> ApiResult<ListResponse<Company>> {
    Ok(Json(ListResponse::new(state.engine.companies().await?)))
}

#[derive(Debug, Deserialize)]
struct NewAccount {
    code: String,
    name: String,
    kind: Option<AccountKind>,
    description: Option<String>,
}

async fn create_account(
    State(state): State<ServiceState>,
    Json(body): Json<NewAccount>,
) -> ApiResult<Account> {
    let mut account = Account::new(body.code, body.name);
    if let Some(kind) = body.kind {
        account = account.with_kind(kind);
    }
    account.description = body.description;
    Ok(Json(state.engine.register_account(account).await?))
}

async fn list_accounts(State(state): State<ServiceState>) -> ApiResult<ListResponse<Account>> {
    Ok(Json(ListResponse::new(state.engine.accounts().await?)))
}

#[derive(Debug, Deserialize)]
struct NewThirdParty {
    name: String,
    nit: String,
    alias: Option<String>,
}

async fn create_third_party(
    State(state): State<ServiceState>,
    Json(body): Json<NewThirdParty>,
) -> ApiResult<ThirdParty> {
    let mut third_party = ThirdParty::new(body.name, &body.nit)?;
    if let Some(alias) = body.alias {
        third_party = third_party.with_alias(alias);
    }
    Ok(Json(state.engine.register_third_party(third_party).await?))
}

async fn list_third_parties(
    State(state): State<ServiceState>,
) -> ApiResult<ListResponse<ThirdParty>> {
    Ok(Json(ListResponse::new(state.engine.third_parties().await?)))
}

// Rules and classification

async fn list_rules(
    Path(company_id): Path<CompanyId>,
    State(state): State<ServiceState>,
) -> ApiResult<ListResponse<ClassificationRule>> {
    Ok(Json(ListResponse::new(state.engine.list_rules(company_id).await?)))
}

#[derive(Debug, Deserialize)]
struct NewRule {
    company_id: CompanyId,
    third_party_id: ThirdPartyId,
    account_id: AccountId,
}

async fn create_rule(
    State(state): State<ServiceState>,
    Json(body): Json<NewRule>,
) -> ApiResult<ClassificationRule> {
    Ok(Json(
        state
            .engine
            .create_manual_rule(body.company_id, body.third_party_id, body.account_id)
            .await?,
    ))
}

async fn delete_rule(
    Path(rule_id): Path<RuleId>,
    State(state): State<ServiceState>,
) -> Result<StatusCode, ApiError> {
    state.engine.delete_rule(rule_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ClassifyRequest {
    company_id: CompanyId,
    third_party_id: ThirdPartyId,
    #[serde(default)]
    text: String,
    amount: Money,
}

async fn classify(
    State(state): State<ServiceState>,
    Json(body): Json<ClassifyRequest>,
) -> ApiResult<Classification> {
    Ok(Json(
        state
            .engine
            .classify(body.company_id, body.third_party_id, &body.text, body.amount)
            .await?,
    ))
}

// Submissions

async fn submit(
    State(state): State<ServiceState>,
    Json(draft): Json<TransactionDraft>,
) -> ApiResult<SubmissionOutcome> {
    Ok(Json(state.engine.submit(draft).await?))
}

async fn validate(
    State(state): State<ServiceState>,
    Json(draft): Json<TransactionDraft>,
) -> ApiResult<ValidationOutcome> {
    Ok(Json(state.engine.validate(&draft).await?))
}

async fn force_save(
    State(state): State<ServiceState>,
    Json(draft): Json<TransactionDraft>,
) -> ApiResult<SubmissionOutcome> {
    Ok(Json(state.engine.force_save(draft).await?))
}

#[derive(Debug, Deserialize)]
struct CorrectionRequest {
    draft: TransactionDraft,
    plan: Vec<MovementCorrection>,
}

async fn apply_corrections(
    State(state): State<ServiceState>,
    Json(body): Json<CorrectionRequest>,
) -> ApiResult<SubmissionOutcome> {
    Ok(Json(
        state
            .engine
            .apply_corrections_and_resubmit(body.draft, &body.plan)
            .await?,
    ))
}

async fn discard(State(state): State<ServiceState>) -> Json<SubmissionOutcome> {
    Json(state.engine.pipeline().discard())
}

async fn edit_movement(
    Path(movement_id): Path<MovementId>,
    State(state): State<ServiceState>,
    Json(edit): Json<MovementEdit>,
) -> ApiResult<EditOutcome> {
    Ok(Json(state.engine.edit_movement(movement_id, edit).await?))
}

// Transactions

#[derive(Debug, Deserialize)]
struct TransactionQuery {
    company_id: Option<CompanyId>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    search: Option<String>,
    #[serde(default)]
    include_deleted: bool,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl TransactionQuery {
    fn into_filter(self) -> TransactionFilter {
        TransactionFilter {
            company_id: self.company_id,
            from: self.from,
            to: self.to,
            search: self.search,
            include_deleted: self.include_deleted,
            window: QueryWindow {
                limit: self.limit.unwrap_or(100).min(1000),
                offset: self.offset.unwrap_or(0),
            },
        }
    }
}

async fn list_transactions(
    State(state): State<ServiceState>,
    Query(query): Query<TransactionQuery>,
) -> ApiResult<ListResponse<Transaction>> {
    let filter = query.into_filter();
    debug!(?filter, "Listing transactions");
    Ok(Json(ListResponse::new(state.engine.list_transactions(filter).await?)))
}

async fn get_transaction(
    Path(id): Path<TransactionId>,
    State(state): State<ServiceState>,
) -> ApiResult<Transaction> {
    Ok(Json(state.engine.get_transaction(id).await?))
}

async fn delete_transaction(
    Path(id): Path<TransactionId>,
    State(state): State<ServiceState>,
) -> ApiResult<Transaction> {
    Ok(Json(state.engine.soft_delete_transaction(id).await?))
}

async fn restore_transaction(
    Path(id): Path<TransactionId>,
    State(state): State<ServiceState>,
) -> ApiResult<Transaction> {
    Ok(Json(state.engine.restore_transaction(id).await?))
}

async fn update_transaction_header(
    Path(id): Path<TransactionId>,
    State(state): State<ServiceState>,
    Json(update): Json<TransactionHeaderUpdate>,
) -> ApiResult<Transaction> {
    Ok(Json(state.engine.update_transaction_header(id, update).await?))
}

#[derive(Debug, Default, Deserialize)]
struct ReverseRequest {
    date: Option<NaiveDate>,
    requested_by: Option<String>,
}

async fn reverse_transaction(
    Path(id): Path<TransactionId>,
    State(state): State<ServiceState>,
    body: Option<Json<ReverseRequest>>,
) -> ApiResult<Transaction> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let date = body.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(
        state
            .engine
            .reverse_transaction(id, date, body.requested_by.as_deref())
            .await?,
    ))
}

// Movements

#[derive(Debug, Deserialize)]
struct MovementQuery {
    company_id: Option<CompanyId>,
    account_id: Option<AccountId>,
    third_party_id: Option<ThirdPartyId>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    limit: Option<usize>,
    offset: Option<usize>,
}

async fn list_movements(
    State(state): State<ServiceState>,
    Query(query): Query<MovementQuery>,
) -> ApiResult<ListResponse<LedgerLine>> {
    let filter = MovementFilter {
        company_id: query.company_id,
        account_id: query.account_id,
        third_party_id: query.third_party_id,
        from: query.from,
        to: query.to,
        window: QueryWindow {
            limit: query.limit.unwrap_or(100).min(1000),
            offset: query.offset.unwrap_or(0),
        },
    };
    debug!(?filter, "Listing movements");
    Ok(Json(ListResponse::new(state.engine.list_movements(filter).await?)))
}

// Reports

#[derive(Debug, Deserialize)]
struct TrialBalanceQuery {
    year: i32,
    month: u32,
    format: Option<String>,
}

async fn trial_balance(
    Path(company_id): Path<CompanyId>,
    State(state): State<ServiceState>,
    Query(query): Query<TrialBalanceQuery>,
) -> Result<Response, ApiError> {
    let report: TrialBalance = state
        .engine
        .trial_balance(company_id, query.year, query.month)
        .await?;

    match query.format.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("json") => Ok(Json(report).into_response()),
        Some("csv") => {
            let body = report.to_csv().map_err(LedgerError::from)?;
            let filename = format!(
                "attachment; filename=\"trial-balance-{}-{:02}.csv\"",
                query.year, query.month
            );
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, filename),
                ],
                body,
            )
                .into_response())
        }
        Some(other) => Err(ApiError::bad_request(format!(
            "invalid format '{other}'; expected json or csv"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct DashboardQuery {
    as_of: Option<NaiveDate>,
}

async fn dashboard(
    Path(company_id): Path<CompanyId>,
    State(state): State<ServiceState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<DashboardStats> {
    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.engine.dashboard(company_id, as_of).await?))
}

// Recurring

#[derive(Debug, Deserialize)]
struct NewRecurring {
    company_id: CompanyId,
    concept: String,
    additional_description: Option<String>,
    day_of_month: u8,
    #[serde(default = "default_active")]
    is_active: bool,
    movements: Vec<MovementTemplate>,
}

fn default_active() -> bool {
    true
}

async fn create_recurring(
    State(state): State<ServiceState>,
    Json(body): Json<NewRecurring>,
) -> ApiResult<RecurringTemplate> {
    let template = RecurringTemplate {
        id: TemplateId::new(),
        company_id: body.company_id,
        concept: body.concept,
        additional_description: body.additional_description,
        day_of_month: body.day_of_month,
        is_active: body.is_active,
        last_generated: None,
        movements: body.movements,
    };
    Ok(Json(state.engine.save_recurring(template).await?))
}

#[derive(Debug, Deserialize)]
struct RecurringQuery {
    company_id: Option<CompanyId>,
}

async fn list_recurring(
    State(state): State<ServiceState>,
    Query(query): Query<RecurringQuery>,
) -> ApiResult<ListResponse<RecurringTemplate>> {
    Ok(Json(ListResponse::new(
        state.engine.list_recurring(query.company_id).await?,
    )))
}

#[derive(Debug, Default, Deserialize)]
struct RunRecurring {
    date: Option<NaiveDate>,
    company_id: Option<CompanyId>,
}

async fn run_recurring(
    State(state): State<ServiceState>,
    body: Option<Json<RunRecurring>>,
) -> ApiResult<RecurringSummary> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let today = body.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.engine.run_recurring(today, body.company_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    struct Seeded {
        state: ServiceState,
        company: CompanyId,
        supplier: ThirdPartyId,
        bank_tp: ThirdPartyId,
        services: AccountId,
        bank: AccountId,
    }

    async fn seeded(config: ServiceConfig) -> Seeded {
        let state = ServiceState::bootstrap(&config).unwrap();
        let engine = &state.engine;
        let company = engine
            .register_company(Company::new("Cortijo SAS", "900123456"))
            .await
            .unwrap()
            .id;
        let supplier = engine
            .register_third_party(ThirdParty::new("Aseo Total", "800197268").unwrap())
            .await
            .unwrap()
            .id;
        let bank_tp = engine
            .register_third_party(ThirdParty::new("Banco del Valle", "860002964").unwrap())
            .await
            .unwrap()
            .id;
        let services = engine.register_account(Account::new("5135", "Servicios")).await.unwrap().id;
        let bank = engine.register_account(Account::new("1110", "Bancos")).await.unwrap().id;
        Seeded {
            state,
            company,
            supplier,
            bank_tp,
            services,
            bank,
        }
    }

    fn draft_json(s: &Seeded, debit: &str, credit: &str) -> serde_json::Value {
        serde_json::json!({
            "company_id": s.company,
            "date": "2026-03-10",
            "concept": "Aseo oficinas",
            "movements": [
                { "account": s.services, "third_party": s.supplier, "debit": debit },
                { "account": s.bank, "third_party": s.bank_tp, "credit": credit }
            ]
        })
    }

    fn post(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_open() {
        let config = ServiceConfig {
            access: config::AccessConfig {
                tokens: vec!["s3cret".to_string()],
            },
            ..ServiceConfig::default()
        };
        let app = build_router(ServiceState::bootstrap(&config).unwrap());
        let response = app.oneshot(get("/v1/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn token_is_required_when_configured() {
        let config = ServiceConfig {
            access: config::AccessConfig {
                tokens: vec!["s3cret".to_string()],
            },
            ..ServiceConfig::default()
        };
        let app = build_router(ServiceState::bootstrap(&config).unwrap());

        let response = app.clone().oneshot(get("/v1/companies")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "unauthorized");

        let authorized = Request::builder()
            .method("GET")
            .uri("/v1/companies")
            .header("authorization", "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(authorized).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn submit_persists_and_lists() {
        let s = seeded(ServiceConfig::default()).await;
        let app = build_router(s.state.clone());

        let response = app
            .clone()
            .oneshot(post("/v1/transactions", &draft_json(&s, "150.00", "150.00")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "persisted");
        assert_eq!(body["transaction"]["number"], "TRX-00001");

        let response = app
            .oneshot(get(&format!("/v1/transactions?company_id={}", s.company)))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["total"], 1);
    }

    #[tokio::test]
    async fn unbalanced_submission_reports_difference() {
        let s = seeded(ServiceConfig::default()).await;
        let app = build_router(s.state.clone());

        let response = app
            .oneshot(post("/v1/transactions", &draft_json(&s, "100", "80")))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["status"], "rejected");
        assert_eq!(body["kind"], "unbalanced");
        assert_eq!(body["difference"], "20.00");
    }

    #[tokio::test]
    async fn unbalancing_edit_is_unprocessable() {
        let s = seeded(ServiceConfig::default()).await;
        let tx = s
            .state
            .engine
            .submit(
                TransactionDraft::new(s.company, NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(), "Aseo")
                    .with_movement(asiento_types::MovementDraft::debit(
                        s.services,
                        s.supplier,
                        Money::new(dec!(100)),
                    ))
                    .with_movement(asiento_types::MovementDraft::credit(
                        s.bank,
                        s.bank_tp,
                        Money::new(dec!(100)),
                    )),
            )
            .await
            .unwrap()
            .transaction()
            .cloned()
            .unwrap();
        let app = build_router(s.state.clone());

        let request = Request::builder()
            .method("PUT")
            .uri(format!("/v1/movements/{}", tx.movements[0].id))
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "debit": "90" }).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["code"], "unprocessable");
    }

    #[tokio::test]
    async fn unknown_transaction_is_not_found() {
        let app = build_router(ServiceState::bootstrap(&ServiceConfig::default()).unwrap());
        let response = app
            .oneshot(get(&format!("/v1/transactions/{}", TransactionId::new())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["code"], "not_found");
    }

    #[tokio::test]
    async fn malformed_nit_is_bad_request() {
        let app = build_router(ServiceState::bootstrap(&ServiceConfig::default()).unwrap());
        let response = app
            .oneshot(post(
                "/v1/third-parties",
                &serde_json::json!({ "name": "Sin NIT", "nit": "12" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn trial_balance_renders_csv() {
        let s = seeded(ServiceConfig::default()).await;
        let app = build_router(s.state.clone());
        let response = app
            .clone()
            .oneshot(post("/v1/transactions", &draft_json(&s, "150", "150")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(get(&format!(
                "/v1/companies/{}/trial-balance?year=2026&month=3&format=csv",
                s.company
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("account_code,account_name"));
        assert!(text.lines().last().unwrap().starts_with("TOTAL,"));

        let response = app
            .oneshot(get(&format!(
                "/v1/companies/{}/trial-balance?year=2026&month=13",
                s.company
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    fn patch_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("PATCH")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn reverse_edit_header_and_list_movements() {
        let s = seeded(ServiceConfig::default()).await;
        let app = build_router(s.state.clone());
        let body = json_body(
            app.clone()
                .oneshot(post("/v1/transactions", &draft_json(&s, "150", "150")))
                .await
                .unwrap(),
        )
        .await;
        let id = body["transaction"]["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(patch_json(
                &format!("/v1/transactions/{id}"),
                &serde_json::json!({ "concept": "Aseo oficinas marzo" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["concept"], "Aseo oficinas marzo");

        let response = app
            .clone()
            .oneshot(patch_json(
                &format!("/v1/transactions/{id}"),
                &serde_json::json!({ "concept": "  " }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(post(
                &format!("/v1/transactions/{id}/reverse"),
                &serde_json::json!({ "date": "2026-03-31", "requested_by": "contador" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let reversal = json_body(response).await;
        assert_eq!(reversal["number"], "TRX-00002");
        assert_eq!(reversal["concept"], "ANULACIÓN - Aseo oficinas marzo");

        let response = app
            .oneshot(get(&format!(
                "/v1/movements?company_id={}&account_id={}",
                s.company, s.services
            )))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["items"][0]["transaction_number"], "TRX-00002");
        assert_eq!(body["items"][0]["credit"], "150.00");
        assert_eq!(body["items"][1]["debit"], "150.00");
    }

    #[tokio::test]
    async fn dashboard_summarises_the_month() {
        let s = seeded(ServiceConfig::default()).await;
        let app = build_router(s.state.clone());
        app.clone()
            .oneshot(post("/v1/transactions", &draft_json(&s, "150", "150")))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(get(&format!(
                "/v1/companies/{}/dashboard?as_of=2026-03-31",
                s.company
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["current_month"]["debits"], "150.00");
        assert_eq!(body["current_month"]["movement_count"], 2);
        assert_eq!(body["monthly_trend"].as_array().unwrap().len(), 6);
        assert_eq!(body["monthly_trend"][5]["month"], "2026-03");
        assert_eq!(body["top_accounts"][0]["total"], "150.00");

        let response = app
            .oneshot(get(&format!("/v1/companies/{}/dashboard", CompanyId::new())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
