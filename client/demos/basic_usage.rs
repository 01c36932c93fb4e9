use std::process::exit;

use serde_json::json;
use solr_client::http::Client;
use solr_client::update::UpdatedFields;
use solr_client::{
    ClientError, CollapseParams, ExpandOptions, Facet, GroupParams, NullPolicy, Operator, Query,
    ReadOptions, Result, WriteOptions,
};

fn main() -> Result<()> {
    env_logger::init();

    // Expect the server URL and the core name
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <host> <core>", args[0]);
        exit(1);
    }

    let client = Client::new(&args[1], &args[2])?;
    client.ping()?;
    println!("Server is up at {}", client.base_path());

    let commit = WriteOptions {
        commit: true,
        ..Default::default()
    };

    // Add some documents
    client.batch_create(
        &json!([
            {"id": "1", "title": "It", "genre": "horror", "year": 1986},
            {"id": "2", "title": "The Shining", "genre": "horror", "year": 1977},
            {"id": "3", "title": "Dune", "genre": "adventure", "year": 1965},
            {"id": "4", "title": "Good Omens", "genre": "comedy", "year": 1990}
        ]),
        Some(&commit),
    )?;
    client.create(
        &json!({"id": "5", "title": "Misery", "genre": "horror", "year": 1987}),
        Some(&commit),
    )?;

    // Term query joined with AND
    let mut query = Query::with_options(&ReadOptions {
        rows: Some(10),
        ..Default::default()
    });
    query.add_term("genre", "horror");
    query.add_term("year", "[1980 TO *]");
    query.set_operator(Operator::And);
    query.set_sort_expression("year desc");
    println!("\nQuery string: {}", query);

    let results = client.search(&query)?;
    println!("Found {} documents", results.num_found());
    for doc in results.docs() {
        println!("- {} ({})", doc["title"], doc["year"]);
    }

    // Facets over the whole core
    let mut query = Query::new();
    query.set_query("*:*");
    query.add_facet(&Facet::new("genre").with_min_count(1));
    let results = client.search(&query)?;
    if let Some(counts) = results.facet_counts.as_ref().and_then(|f| f.field("genre")) {
        println!("\nGenres:");
        for (genre, count) in counts {
            println!("- {}: {}", genre, count);
        }
    }

    // Grouping by field
    let mut query = Query::new();
    query.set_query("*:*");
    query.group(&GroupParams::by_field("genre").with_limit(3).with_group_count())?;
    let results = client.search(&query)?;
    if let Some(groups) = results
        .grouped
        .as_ref()
        .and_then(|g| g.get("genre"))
        .and_then(|r| r.groups())
    {
        println!("\nGroups:");
        for group in groups {
            println!("- {}: {} docs", group.value, group.doc_list.num_found);
        }
    }

    // Collapse and expand
    let mut query = Query::new();
    query.set_query("*:*");
    query.collapse(
        &CollapseParams::new("genre")
            .with_max("year")
            .with_null_policy(NullPolicy::Ignore),
    )?;
    query.expand(Some(&ExpandOptions {
        rows: Some(5),
        ..Default::default()
    }));
    let results = client.search(&query)?;
    println!("\nCollapsed to {} documents", results.num_found());

    // Atomic update
    client.update(
        &UpdatedFields::new("3").set("title", "Dune Messiah").increment_by("year", 4),
        Some(&commit),
    )?;
    let updated = client.get("3")?;
    println!("\nUpdated document: {:?}", updated.doc);

    // A bad query surfaces the server error
    let mut query = Query::new();
    query.set_query("nosuchfield:value");
    match client.search(&query) {
        Err(ClientError::Server { error, .. }) => {
            println!("\nServer error {}: {}", error.code, error)
        }
        Err(err) => return Err(err),
        Ok(_) => println!("\nQuery unexpectedly succeeded"),
    }

    client.clear()?;
    println!("Documents deleted");

    Ok(())
}
