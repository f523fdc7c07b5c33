use std::error::Error;

use proxidb_client::{AdminClient, Client, Key, Record, Value};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Create clients with default configuration (localhost:50051)
    let admin = AdminClient::default().await?;
    let client = Client::default().await?;

    // Create an index over the "embedding" field
    admin
        .index_create(
            "prod".to_string(),
            "item-index".to_string(),
            "embedding".to_string(),
            3,
            None,
            None,
            None,
            None,
        )
        .await?;

    // Write a couple of records
    for (name, vector) in [
        ("item-1", vec![0.1f32, 0.2, 0.3]),
        ("item-2", vec![0.9f32, 0.8, 0.7]),
    ] {
        let key = Key::with_set("prod", "items", name);
        let record: Record = [
            ("embedding", Value::from(vector)),
            ("label", Value::from(name)),
        ]
        .into_iter()
        .collect();
        client.upsert(&key, &record, None).await?;
    }

    // Wait for the index to catch up, then search
    client.indexes_in_sync(None).await?;

    let neighbors = client
        .vector_search(
            "prod".to_string(),
            "item-index".to_string(),
            vec![0.1, 0.2, 0.3],
            10,
            None,
            None,
            None,
        )
        .await?;

    println!("{} neighbors:", neighbors.len());
    for neighbor in neighbors {
        println!("  {} at distance {}", neighbor.key.key, neighbor.distance);
    }

    client.close();
    admin.close();
    Ok(())
}
