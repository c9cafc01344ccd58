//! Command handlers.
//!
//! Handlers take their embedding provider and generation client as
//! arguments; [`crate::app::VicinityCli`] builds them from configuration.

use std::fmt;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use vicinity_content::{SourceLoader, SourceUnit};
use vicinity_core::traits::{ConfigProvider, DATA_DIR, INDEX_DIR};
use vicinity_core::{Error, Result, write_atomic};
use vicinity_llm::{GenerationClient, GenerationRequest};
use vicinity_pipeline::social::{
    FriendRecommender, PeopleSearch, PersonMatch, RsvpSimulator, load_events, load_users,
    save_events,
};
use vicinity_pipeline::{IndexBuild, IndexBuilder, RetrievalPipeline};
use vicinity_vector::{EmbeddingProvider, GeoPoint, IndexPaths, load_image};

use crate::config::VicinityConfig;
use crate::repl;

// ============================================================================
// Index
// ============================================================================

/// State of the persisted image.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexStatus {
    /// No image at the configured location.
    Missing,
    /// The image loads.
    Ready {
        /// Stored chunks.
        chunks: usize,
        /// Vector dimension, if any vector is stored.
        dimension: Option<usize>,
    },
    /// An image exists but does not load.
    Unreadable(String),
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Ready {
                chunks,
                dimension: Some(d),
            } => write!(f, "ready ({chunks} chunks, dimension {d})"),
            Self::Ready { chunks, .. } => write!(f, "ready ({chunks} chunks)"),
            Self::Unreadable(reason) => write!(f, "unreadable ({reason})"),
        }
    }
}

/// Where the image for `config` lives.
pub fn index_paths(config: &VicinityConfig) -> Result<IndexPaths> {
    Ok(IndexPaths::new(config.content_path(INDEX_DIR)?))
}

/// Read the data directory.
///
/// A missing directory is an error unless `allow_missing`, in which case no
/// units are returned.
pub async fn load_units(config: &VicinityConfig, allow_missing: bool) -> Result<Vec<SourceUnit>> {
    let dir = config.content_path(DATA_DIR)?;
    if !dir.is_dir() {
        if allow_missing {
            log::debug!("Data directory {} not found", dir.display());
            return Ok(Vec::new());
        }
        return Err(Error::not_found(format!(
            "data directory {}",
            dir.display()
        )));
    }
    let units = SourceLoader::new().load_dir(&dir).await?;
    log::info!("Loaded {} source files from {}", units.len(), dir.display());
    Ok(units)
}

fn builder(config: &VicinityConfig, embedder: Arc<dyn EmbeddingProvider>) -> IndexBuilder {
    IndexBuilder::new(embedder)
        .with_chunker(config.index.chunker())
        .with_batch_size(config.embedding.batch_size)
        .with_concurrency(config.embedding.concurrency)
}

/// Report on the image without building anything.
pub fn handle_index_check(config: &VicinityConfig) -> Result<IndexStatus> {
    let paths = index_paths(config)?;
    let status = if !paths.exists() {
        IndexStatus::Missing
    } else {
        match load_image(&paths) {
            Ok((index, store)) => IndexStatus::Ready {
                chunks: store.len(),
                dimension: index.dimension(),
            },
            Err(e) => IndexStatus::Unreadable(e.to_string()),
        }
    };
    println!("Index at {}: {status}", paths.dir().display());
    Ok(status)
}

/// Build the image from the data directory, or load it when usable.
pub async fn handle_index(
    config: &VicinityConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    force: bool,
) -> Result<IndexBuild> {
    let paths = index_paths(config)?;
    let units = load_units(config, false).await?;
    let builder = builder(config, embedder);

    let build = if force {
        builder.build(units, &paths).await?
    } else {
        builder.build_or_load(units, &paths).await?
    };

    let verb = if build.from_cache { "Loaded" } else { "Built" };
    println!(
        "{verb} index at {}: {} chunks",
        paths.dir().display(),
        build.store.len()
    );
    Ok(build)
}

// ============================================================================
// Ask / chat
// ============================================================================

/// Open the retrieval pipeline, building the image first if needed.
pub async fn open_pipeline(
    config: &VicinityConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationClient>,
) -> Result<RetrievalPipeline> {
    let paths = index_paths(config)?;
    let units = load_units(config, paths.exists()).await?;
    let build = builder(config, embedder.clone())
        .build_or_load(units, &paths)
        .await?;

    Ok(RetrievalPipeline::from_build(build, embedder, generator)
        .with_model(config.generation.model.clone())
        .with_chunker(config.index.chunker())
        .with_batch_size(config.embedding.batch_size)
        .with_concurrency(config.embedding.concurrency))
}

/// Answer one question, or every question read from `input`.
pub async fn handle_ask<R, W>(
    pipeline: &RetrievalPipeline,
    question: Option<String>,
    top_k: usize,
    input: R,
    mut output: W,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    if let Some(question) = question {
        let answer = pipeline.answer(&question, top_k).await?;
        writeln!(output, "{answer}")?;
        return Ok(());
    }

    writeln!(
        output,
        "Ask about the {} indexed chunks; type 'exit' to quit.",
        pipeline.len()
    )?;
    repl::run_loop(input, output, "Question", |q| {
        let pipeline = pipeline.clone();
        async move { pipeline.answer(&q, top_k).await }
    })
    .await?;
    Ok(())
}

/// Relay lines from `input` to the generator without retrieval.
pub async fn handle_chat<R, W>(
    generator: Arc<dyn GenerationClient>,
    model: &str,
    input: R,
    mut output: W,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    writeln!(output, "Chatting with {model}; type 'exit' to quit.")?;
    repl::run_loop(input, output, "You", |prompt| {
        let generator = generator.clone();
        let request = GenerationRequest::new(model, prompt);
        async move {
            generator
                .generate(request)
                .await
                .map(|answer| answer.trim().to_string())
        }
    })
    .await?;
    Ok(())
}

// ============================================================================
// Social
// ============================================================================

/// Write friend recommendations for every indexable user to `output`.
///
/// Returns the number of users with recommendations.
pub async fn handle_recommend(
    config: &VicinityConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    users: &Path,
    events: &Path,
    output: &Path,
    top_n: Option<usize>,
) -> Result<usize> {
    let users = load_users(users)?;
    let events = load_events(events)?;
    let recommendations = FriendRecommender::new(embedder)
        .with_top_n(top_n.unwrap_or(config.social.friends_top_n))
        .recommend(&users, &events)
        .await?;

    write_atomic(output, &serde_json::to_vec_pretty(&recommendations)?)?;
    println!(
        "Wrote recommendations for {} users to {}",
        recommendations.len(),
        output.display()
    );
    Ok(recommendations.len())
}

/// Fill every event's RSVP list and write the events to `output` once.
///
/// Returns the number of RSVPs written.
pub async fn handle_rsvp(
    config: &VicinityConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    users: &Path,
    events: &Path,
    output: &Path,
    top_k: Option<usize>,
) -> Result<usize> {
    let users = load_users(users)?;
    let mut events = load_events(events)?;
    let total = RsvpSimulator::new(embedder)
        .with_top_k(top_k.unwrap_or(config.social.rsvp_top_k))
        .simulate(&users, &mut events)
        .await?;

    save_events(output, &events)?;
    println!(
        "Wrote {total} RSVPs across {} events to {}",
        events.len(),
        output.display()
    );
    Ok(total)
}

/// Options for [`handle_people`].
#[derive(Debug, Clone, Default)]
pub struct PeopleQuery {
    /// Free-text query.
    pub query: String,
    /// Search origin.
    pub origin: Option<GeoPoint>,
    /// Radius override in kilometers.
    pub radius_km: Option<f64>,
}

/// Search users and print the matches.
pub async fn handle_people<W: Write>(
    config: &VicinityConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    users: &Path,
    events: &Path,
    query: PeopleQuery,
    mut output: W,
) -> Result<Vec<PersonMatch>> {
    let users = load_users(users)?;
    let events = load_events(events)?;
    let search = PeopleSearch::build(embedder, &users, &events)
        .await?
        .with_radius_km(query.radius_km.unwrap_or(config.social.radius_km));

    let matches = search.search(&query.query, query.origin).await?;
    if matches.is_empty() {
        writeln!(output, "No matching people.")?;
    }
    for (rank, m) in matches.iter().enumerate() {
        write!(
            output,
            "{}. {} ({}, {}) score {:.4}",
            rank + 1,
            m.email,
            m.city,
            m.state,
            m.score
        )?;
        if let Some(d) = m.distance_km {
            write!(output, ", {d:.1} km")?;
        }
        writeln!(output)?;
        if !m.attended.is_empty() {
            writeln!(output, "   attended: {}", m.attended.join(", "))?;
        }
    }
    Ok(matches)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;
    use vicinity_llm::MockGenerationClient;
    use vicinity_vector::MockEmbeddingProvider;

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        Arc::new(MockEmbeddingProvider::new(16))
    }

    fn config_in(dir: &TempDir) -> VicinityConfig {
        let mut config = VicinityConfig {
            base_path: Some(dir.path().to_string_lossy().into_owned()),
            ..Default::default()
        };
        config.embedding.provider = "mock".into();
        config.embedding.dimension = 16;
        config.index.window = 8;
        config
    }

    fn write_data(dir: &TempDir) {
        let data = dir.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(
            data.join("routes.txt"),
            "Route 62 runs along Hardy Drive every fifteen minutes on weekdays",
        )
        .unwrap();
        std::fs::write(
            data.join("stops.csv"),
            "stop_name,route\nMill Ave,62\nRural Rd,72\n",
        )
        .unwrap();
    }

    fn write_social(dir: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
        let users = dir.path().join("users.json");
        let events = dir.path().join("events.json");
        std::fs::write(
            &users,
            r#"[
                {"email": "ana@x", "bio": "Runner", "interests": ["hiking"],
                 "location": {"city": "Tempe", "state": "AZ", "latitude": 33.42, "longitude": -111.94}},
                {"email": "ben@x", "bio": "Runner", "interests": ["hiking"],
                 "location": {"city": "Tucson", "state": "AZ", "latitude": 32.22, "longitude": -110.97}},
                {"email": "cal@x", "bio": "Painter", "interests": ["art"]}
            ]"#,
        )
        .unwrap();
        std::fs::write(
            &events,
            r#"[{"id": "e1", "title": "Summit Hike", "categories": ["outdoors"],
                 "location": {"city": "Tempe", "state": "AZ"},
                 "rsvpList": [{"email": "ana@x", "status": "attended"}]}]"#,
        )
        .unwrap();
        (users, events)
    }

    // ------------------------------------------------------------------------
    // Index
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_index_builds_then_loads() {
        let dir = TempDir::new().unwrap();
        write_data(&dir);
        let config = config_in(&dir);

        let first = handle_index(&config, embedder(), false).await.unwrap();
        assert!(!first.from_cache);
        assert_eq!(first.store.len(), 4);

        let second = handle_index(&config, embedder(), false).await.unwrap();
        assert!(second.from_cache);

        let forced = handle_index(&config, embedder(), true).await.unwrap();
        assert!(!forced.from_cache);
    }

    #[tokio::test]
    async fn test_index_without_data_dir_fails() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        assert!(matches!(
            handle_index(&config, embedder(), false).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_index_check_states() {
        let dir = TempDir::new().unwrap();
        write_data(&dir);
        let config = config_in(&dir);

        assert_eq!(handle_index_check(&config).unwrap(), IndexStatus::Missing);

        handle_index(&config, embedder(), false).await.unwrap();
        assert_eq!(
            handle_index_check(&config).unwrap(),
            IndexStatus::Ready {
                chunks: 4,
                dimension: Some(16)
            }
        );

        let paths = index_paths(&config).unwrap();
        std::fs::write(paths.vectors(), b"garbage").unwrap();
        assert!(matches!(
            handle_index_check(&config).unwrap(),
            IndexStatus::Unreadable(_)
        ));
    }

    // ------------------------------------------------------------------------
    // Ask / chat
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_ask_one_shot() {
        let dir = TempDir::new().unwrap();
        write_data(&dir);
        let config = config_in(&dir);
        let generator = Arc::new(MockGenerationClient::with_response("  Route 62.  "));
        let pipeline = open_pipeline(&config, embedder(), generator.clone())
            .await
            .unwrap();

        let mut out = Vec::new();
        handle_ask(
            &pipeline,
            Some("Which route uses Hardy Drive?".into()),
            2,
            Cursor::new(""),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "Route 62.\n");
        let prompts = generator.prompts().await;
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].ends_with("Question: Which route uses Hardy Drive?"));
    }

    #[tokio::test]
    async fn test_ask_loop_uses_loaded_image_without_data_dir() {
        let dir = TempDir::new().unwrap();
        write_data(&dir);
        let config = config_in(&dir);
        handle_index(&config, embedder(), false).await.unwrap();
        std::fs::remove_dir_all(dir.path().join("data")).unwrap();

        let generator = Arc::new(MockGenerationClient::new(vec![
            "first".into(),
            "second".into(),
        ]));
        let pipeline = open_pipeline(&config, embedder(), generator.clone())
            .await
            .unwrap();
        assert_eq!(pipeline.len(), 4);

        let mut out = Vec::new();
        handle_ask(&pipeline, None, 3, Cursor::new("one\ntwo\nEXIT\n"), &mut out)
            .await
            .unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("first"));
        assert!(out.contains("second"));
        assert_eq!(generator.prompts().await.len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_image_without_data_dir_is_reported() {
        let dir = TempDir::new().unwrap();
        write_data(&dir);
        let config = config_in(&dir);
        handle_index(&config, embedder(), false).await.unwrap();
        std::fs::remove_dir_all(dir.path().join("data")).unwrap();
        let paths = index_paths(&config).unwrap();
        std::fs::write(paths.vectors(), b"garbage").unwrap();

        let generator = Arc::new(MockGenerationClient::with_response("unused"));
        let err = open_pipeline(&config, embedder(), generator.clone())
            .await
            .err()
            .unwrap();
        assert!(err.is_corrupt_index());
        assert_eq!(std::fs::read(paths.vectors()).unwrap(), b"garbage");

        write_data(&dir);
        let pipeline = open_pipeline(&config, embedder(), generator)
            .await
            .unwrap();
        assert_eq!(pipeline.len(), 4);
    }

    #[tokio::test]
    async fn test_chat_skips_retrieval() {
        let generator = Arc::new(MockGenerationClient::with_response("hello there\n"));
        let mut out = Vec::new();
        handle_chat(
            generator.clone(),
            "mistral",
            Cursor::new("hi\nquit\n"),
            &mut out,
        )
        .await
        .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("hello there\n"));
        let requests = generator.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "mistral");
        assert_eq!(requests[0].prompt, "hi");
    }

    // ------------------------------------------------------------------------
    // Social
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_recommend_writes_json() {
        let dir = TempDir::new().unwrap();
        let (users, events) = write_social(&dir);
        let output = dir.path().join("out").join("friends.json");
        let config = config_in(&dir);

        let n = handle_recommend(&config, embedder(), &users, &events, &output, Some(1))
            .await
            .unwrap();
        assert_eq!(n, 3);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(raw["ana@x"].as_array().unwrap().len(), 1);
        assert!(raw["ana@x"][0]["sharedEvents"].is_array());
    }

    #[tokio::test]
    async fn test_rsvp_writes_events_once() {
        let dir = TempDir::new().unwrap();
        let (users, events) = write_social(&dir);
        let output = dir.path().join("with_rsvp.json");
        let config = config_in(&dir);

        let total = handle_rsvp(&config, embedder(), &users, &events, &output, None)
            .await
            .unwrap();
        assert_eq!(total, 3);

        let written = load_events(&output).unwrap();
        assert_eq!(written[0].rsvp_list.len(), 3);
        assert!(written[0].rsvp_list[0].is_attended());
        // The input file is left alone.
        assert_eq!(load_events(&events).unwrap()[0].rsvp_list.len(), 1);
    }

    #[tokio::test]
    async fn test_people_radius_and_output() {
        let dir = TempDir::new().unwrap();
        let (users, events) = write_social(&dir);
        let config = config_in(&dir);

        let mut out = Vec::new();
        let matches = handle_people(
            &config,
            embedder(),
            &users,
            &events,
            PeopleQuery {
                query: "hiking".into(),
                origin: Some(GeoPoint::new(33.45, -112.07)),
                radius_km: None,
            },
            &mut out,
        )
        .await
        .unwrap();

        let emails: Vec<&str> = matches.iter().map(|m| m.email.as_str()).collect();
        assert!(emails.contains(&"ana@x"));
        assert!(emails.contains(&"cal@x"));
        assert!(!emails.contains(&"ben@x"));

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("ana@x (Tempe, AZ)"));
        assert!(out.contains("attended: Summit Hike"));
    }

    #[test]
    fn test_index_status_display() {
        assert_eq!(IndexStatus::Missing.to_string(), "missing");
        assert_eq!(
            IndexStatus::Ready {
                chunks: 3,
                dimension: Some(8)
            }
            .to_string(),
            "ready (3 chunks, dimension 8)"
        );
    }
}
