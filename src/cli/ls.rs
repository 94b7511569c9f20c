use std::path::Path;

use tabled::Table;

use crate::{error, info, types::EntryTableRow, warning};

pub async fn ls(path: Option<String>, settings_path: &Path) {
    let (_, storage) = match super::open_storage(settings_path).await {
        Ok(opened) => opened,
        Err(e) => error!("Cannot open storage: {}", e),
    };

    let path = path.unwrap_or_default();
    let mut names = match storage.list_files(&path).await {
        Ok(names) => names,
        Err(e) => error!("Cannot list {}: {}", storage.resolve(&path), e),
    };

    if names.is_empty() {
        warning!("Nothing stored at {}", storage.resolve(&path));
        return;
    }

    names.sort();
    info!("{} entries at {}", names.len(), storage.resolve(&path));
    let rows: Vec<EntryTableRow> = names
        .into_iter()
        .map(|name| EntryTableRow { name })
        .collect();
    println!("{}", Table::new(rows));
}
