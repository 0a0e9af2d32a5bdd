use may_minihttp::HttpServer;

use stockroom::chemicals::ChemicalStore;
use stockroom::config::AppConfig;
use stockroom::connection::connect;
use stockroom::http::InventoryService;
use stockroom::inventory_logs::InventoryLogStore;
use stockroom::pool::PgPool;
use stockroom::schema::ensure_schema;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load()?;

    // Provision the schema over a short-lived direct connection before the
    // pool dials in.
    let bootstrap = connect(&config.database.url)?;
    ensure_schema(&bootstrap)?;
    drop(bootstrap);

    let pool = PgPool::connect(&config.database)?;
    let chemicals = ChemicalStore::new(pool.clone(), &config.database);
    let logs = InventoryLogStore::new(pool, &config.database);
    let service = InventoryService::new(chemicals, logs);

    let addr = config.server.bind_addr();
    log::info!("stockroom listening on {addr}");
    let server = HttpServer(service).start(&addr)?;
    server
        .join()
        .map_err(|err| format!("server terminated abnormally: {err:?}").into())
}
