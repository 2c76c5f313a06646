// src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use painel_entregas::{
    build_router,
    config::{connect_database, AppState, Settings},
};

#[tokio::main]
async fn main() {
    // Inicializa o logger (RUST_LOG, padrão "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let settings = Settings::from_env().expect("Falha ao carregar a configuração.");

    let db_pool = connect_database(&settings)
        .await
        .expect("Falha ao conectar ao banco de dados.");

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let addr = settings.server_addr.clone();
    let app_state = AppState::new(settings, db_pool).expect("Falha ao inicializar o estado da aplicação.");
    let app = build_router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", addr);
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
