use std::path::Path;

use tabled::Table;

use crate::{config::Zone, error, info, types::ZoneTableRow};

/// Shows the storage root and whether each zone exists yet.
pub async fn info(settings_path: &Path) {
    let (settings, storage) = match super::open_storage(settings_path).await {
        Ok(opened) => opened,
        Err(e) => error!("Cannot open storage: {}", e),
    };

    info!("Storage root: {}", storage.root());

    let mut rows = Vec::with_capacity(Zone::ALL.len());
    for zone in Zone::ALL {
        let path = settings.zone(zone);
        let exists = match storage.exists(path).await {
            Ok(true) => "yes".to_string(),
            Ok(false) => "no".to_string(),
            Err(e) => format!("error: {}", e),
        };
        rows.push(ZoneTableRow {
            zone: zone.label().to_string(),
            path: path.to_string(),
            location: storage.resolve(path).to_string(),
            exists,
        });
    }

    println!("{}", Table::new(rows));
}
