use crate::cli::ServeArgs;
use crate::infra::{seeded_store, AppState, TracingDispatcher};
use crate::routes::with_survey_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use riskpulse::config::AppConfig;
use riskpulse::error::AppError;
use riskpulse::telemetry;
use riskpulse::workflows::survey::{
    ConversationEngine, EngineOptions, ScoringEngine, SurveyAnalyticsService, SurveyServices,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(seeded_store());
    let options = EngineOptions {
        questionnaire_name: config.survey.questionnaire.clone(),
        interactive_delivery: config.survey.interactive_delivery,
    };
    let engine = ConversationEngine::new(Arc::clone(&store), Arc::new(TracingDispatcher), options);
    let analytics = SurveyAnalyticsService::new(store, ScoringEngine::default());
    let services = Arc::new(SurveyServices::new(engine, analytics));

    let app = with_survey_routes(services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        questionnaire = config.survey.questionnaire.as_deref().unwrap_or("any active"),
        "psychosocial survey service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
