use rusqlite::{params, Connection, Result as SqlResult, Row};
use tracing::debug;
use uuid::Uuid;

use dubbo_boot_core::time::now;
use dubbo_boot_core::{
    ExportError, ExportedService, Exporter, RegistryError, RegistryStore, ServiceConfig,
};

/// Provider registry backed by SQLite.
pub struct DbRegistry {
    conn: Connection,
}

impl DbRegistry {
    pub fn new(path: &str) -> SqlResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_tables()?;
        Ok(db)
    }

    /// Opens a registry address of the form `sqlite://<path>` or a bare path.
    pub fn open(address: &str) -> SqlResult<Self> {
        Self::new(address.strip_prefix("sqlite://").unwrap_or(address))
    }

    pub fn in_memory() -> SqlResult<Self> {
        Self::new(":memory:")
    }

    fn init_tables(&self) -> SqlResult<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS providers (
                url TEXT PRIMARY KEY,
                id TEXT NOT NULL,
                interface TEXT NOT NULL,
                application TEXT NOT NULL,
                bean_name TEXT NOT NULL,
                http_check_url TEXT NOT NULL,
                exported_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS providers_interface ON providers(interface);
            "
        )?;
        Ok(())
    }

    fn query_providers(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<ExportedService>, RegistryError> {
        let mut stmt = self.conn.prepare(sql).map_err(storage)?;
        let rows = stmt.query_map(params, provider_from_row).map_err(storage)?;
        rows.collect::<SqlResult<Vec<_>>>().map_err(storage)
    }
}

fn storage(e: rusqlite::Error) -> RegistryError {
    RegistryError::Storage(e.to_string())
}

fn provider_from_row(row: &Row<'_>) -> SqlResult<ExportedService> {
    let id: String = row.get(1)?;
    let id = Uuid::parse_str(&id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let exported_at: i64 = row.get(6)?;

    Ok(ExportedService {
        id,
        url: row.get(0)?,
        interface: row.get(2)?,
        application: row.get(3)?,
        bean_name: row.get(4)?,
        http_check_url: row.get(5)?,
        exported_at: exported_at as u64,
    })
}

const SELECT_PROVIDERS: &str =
    "SELECT url, id, interface, application, bean_name, http_check_url, exported_at FROM providers";

impl RegistryStore for DbRegistry {
    fn add_provider(&self, provider: &ExportedService) -> Result<(), RegistryError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO providers (url, id, interface, application, bean_name, http_check_url, exported_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                provider.url,
                provider.id.to_string(),
                provider.interface,
                provider.application,
                provider.bean_name,
                provider.http_check_url,
                provider.exported_at as i64
            ]
        ).map_err(storage)?;
        Ok(())
    }

    fn get_providers(&self, interface: &str) -> Result<Vec<ExportedService>, RegistryError> {
        self.query_providers(
            &format!("{SELECT_PROVIDERS} WHERE interface = ?1 ORDER BY exported_at, url"),
            [interface],
        )
    }

    fn get_all_providers(&self) -> Result<Vec<ExportedService>, RegistryError> {
        self.query_providers(
            &format!("{SELECT_PROVIDERS} ORDER BY interface, exported_at, url"),
            params![],
        )
    }

    fn remove_provider(&self, url: &str) -> Result<(), RegistryError> {
        let removed = self
            .conn
            .execute("DELETE FROM providers WHERE url = ?1", [url])
            .map_err(storage)?;
        if removed == 0 {
            return Err(RegistryError::ProviderNotFound);
        }
        Ok(())
    }
}

impl Exporter for DbRegistry {
    fn export(&self, config: ServiceConfig) -> Result<ExportedService, ExportError> {
        let service = ExportedService::from_config(&config, now())?;
        self.add_provider(&service)
            .map_err(|e| ExportError::Registry(e.to_string()))?;
        debug!(url = %service.url, registry = %config.registry_address, "provider stored");
        Ok(service)
    }
}
