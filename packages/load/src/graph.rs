//! Neo4j graph of tweets, users, places, and hashtags.
//!
//! Each record becomes one `MERGE` statement:
//!
//! - `(:Tweet)-[:TWEETED_BY]->(:User)` and `(:User)-[:TWEETED]->(:Tweet)`
//! - `(:Tweet)-[:LOCATED_AT]->(:Place)` with the repaired box corners and
//!   centroid as Neo4j points
//! - `(:Tweet)-[:MENTIONS]->(:User)` per user mention
//! - `(:Tweet)-[:HASHTAGS]->(:Hashtag)` per hashtag
//!
//! Optional parts of a record (author, tweet coordinates) are passed as
//! flags rather than nulls so the statement never writes a null property.

use geotweet_load_models::{BackendKind, LoadFailure};
use geotweet_record_models::{Position, Record};
use neo4rs::{ConfigBuilder, Graph, Query, query};
use serde_json::Value;

use crate::{LoadError, PersistenceAdapter};

const MERGE_TWEET: &str = "
MERGE (t:Tweet {tweet_id: $tweet_id})
ON CREATE SET t.text = $text,
    t.lang = $lang,
    t.timestamp_ms = $timestamp_ms,
    t.retweet_count = $retweet_count,
    t.favorite_count = $favorite_count,
    t.coordinates = CASE WHEN $has_coordinates
        THEN point({longitude: $coordinates_lon, latitude: $coordinates_lat})
        ELSE null END

FOREACH (_ IN CASE WHEN $has_user THEN [1] ELSE [] END |
    MERGE (u:User {user_id: $user_id})
    SET u.name = $user_name,
        u.screen_name = $user_screen_name,
        u.followers_count = $user_followers_count
    MERGE (t)-[:TWEETED_BY]->(u)
    MERGE (u)-[:TWEETED]->(t)
)

MERGE (p:Place {place_id: $place_id})
SET p.name = $place_name,
    p.full_name = $place_full_name,
    p.country = $place_country,
    p.country_code = $place_country_code,
    p.place_type = $place_type,
    p.centroid_hash = $place_centroid_hash,
    p.bounding_box_ll = point({longitude: $place_ll_lon, latitude: $place_ll_lat}),
    p.bounding_box_ur = point({longitude: $place_ur_lon, latitude: $place_ur_lat}),
    p.centroid = point({longitude: $place_centroid_lon, latitude: $place_centroid_lat})
MERGE (t)-[:LOCATED_AT]->(p)

FOREACH (i IN range(0, size($mention_ids) - 1) |
    MERGE (m:User {user_id: $mention_ids[i]})
    SET m.name = $mention_names[i],
        m.screen_name = $mention_screen_names[i]
    MERGE (t)-[:MENTIONS]->(m)
)

FOREACH (tag IN $hashtags |
    MERGE (h:Hashtag {hashtag_id: tag})
    MERGE (t)-[:HASHTAGS]->(h)
)
";

/// The author of a tweet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserParams {
    pub id: String,
    pub name: String,
    pub screen_name: String,
    pub followers_count: i64,
}

/// Everything the graph statement needs from one record, flattened into
/// non-null values.
#[derive(Debug, Clone, PartialEq)]
pub struct TweetGraphParams {
    pub tweet_id: String,
    pub text: String,
    pub lang: String,
    pub timestamp_ms: i64,
    pub retweet_count: i64,
    pub favorite_count: i64,
    /// Exact tweet location, when the user shared one.
    pub coordinates: Option<Position>,
    pub user: Option<UserParams>,
    pub place_id: String,
    pub place_name: String,
    pub place_full_name: String,
    pub place_country: String,
    pub place_country_code: String,
    pub place_type: String,
    pub place_centroid_hash: String,
    pub place_lower_left: Position,
    pub place_upper_right: Position,
    pub place_centroid: Position,
    /// Mentioned users as `(id, name, screen_name)`.
    pub mentions: Vec<(String, String, String)>,
    pub hashtags: Vec<String>,
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_of(value: Option<&Value>) -> String {
    value.and_then(Value::as_str).unwrap_or_default().to_string()
}

fn count_of(value: Option<&Value>) -> i64 {
    value.and_then(Value::as_i64).unwrap_or_default()
}

impl TweetGraphParams {
    /// Extracts the statement parameters from a cleaned record.
    #[must_use]
    pub fn from_record(record: &Record) -> Self {
        let place = &record.place;
        let centroid = place.centroid.coordinates;

        let user = record.lookup(&["user"]).and_then(|user| {
            Some(UserParams {
                id: user.get("id_str").or_else(|| user.get("id")).and_then(id_text)?,
                name: text_of(user.get("name")),
                screen_name: text_of(user.get("screen_name")),
                followers_count: count_of(user.get("followers_count")),
            })
        });

        let coordinates = record
            .lookup(&["coordinates", "coordinates"])
            .and_then(Value::as_array)
            .and_then(|pair| match pair.as_slice() {
                [lon, lat] => Some(Position::new(lon.as_f64()?, lat.as_f64()?)),
                _ => None,
            })
            .filter(Position::is_valid);

        let mentions = record
            .lookup(&["entities", "user_mentions"])
            .and_then(Value::as_array)
            .map(|mentions| {
                mentions
                    .iter()
                    .filter_map(|m| {
                        Some((
                            m.get("id_str").or_else(|| m.get("id")).and_then(id_text)?,
                            text_of(m.get("name")),
                            text_of(m.get("screen_name")),
                        ))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let hashtags = record
            .lookup(&["entities", "hashtags"])
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(|tag| tag.get("text").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            tweet_id: record.id.clone(),
            text: record.text().unwrap_or_default().to_string(),
            lang: text_of(record.lookup(&["lang"])),
            timestamp_ms: record.timestamp,
            retweet_count: count_of(record.lookup(&["retweet_count"])),
            favorite_count: count_of(record.lookup(&["favorite_count"])),
            coordinates,
            user,
            place_id: place.id.clone(),
            place_name: place.name.clone(),
            place_full_name: place.full_name.clone(),
            place_country: place.country.clone(),
            place_country_code: place.country_code.clone(),
            place_type: place.place_type.clone(),
            place_centroid_hash: place.centroid_hash.clone(),
            place_lower_left: place.lower_left().unwrap_or(centroid),
            place_upper_right: place.upper_right().unwrap_or(centroid),
            place_centroid: centroid,
            mentions,
            hashtags,
        }
    }

    /// Binds the parameters to the merge statement.
    #[must_use]
    pub fn into_query(self) -> Query {
        let coordinates = self.coordinates.unwrap_or_default();
        let user = self.user.clone().unwrap_or_else(|| UserParams {
            id: String::new(),
            name: String::new(),
            screen_name: String::new(),
            followers_count: 0,
        });

        let mut mention_ids = Vec::with_capacity(self.mentions.len());
        let mut mention_names = Vec::with_capacity(self.mentions.len());
        let mut mention_screen_names = Vec::with_capacity(self.mentions.len());
        for (id, name, screen_name) in self.mentions {
            mention_ids.push(id);
            mention_names.push(name);
            mention_screen_names.push(screen_name);
        }

        query(MERGE_TWEET)
            .param("tweet_id", self.tweet_id)
            .param("text", self.text)
            .param("lang", self.lang)
            .param("timestamp_ms", self.timestamp_ms)
            .param("retweet_count", self.retweet_count)
            .param("favorite_count", self.favorite_count)
            .param("has_coordinates", self.coordinates.is_some())
            .param("coordinates_lon", coordinates.lon)
            .param("coordinates_lat", coordinates.lat)
            .param("has_user", self.user.is_some())
            .param("user_id", user.id)
            .param("user_name", user.name)
            .param("user_screen_name", user.screen_name)
            .param("user_followers_count", user.followers_count)
            .param("place_id", self.place_id)
            .param("place_name", self.place_name)
            .param("place_full_name", self.place_full_name)
            .param("place_country", self.place_country)
            .param("place_country_code", self.place_country_code)
            .param("place_type", self.place_type)
            .param("place_centroid_hash", self.place_centroid_hash)
            .param("place_ll_lon", self.place_lower_left.lon)
            .param("place_ll_lat", self.place_lower_left.lat)
            .param("place_ur_lon", self.place_upper_right.lon)
            .param("place_ur_lat", self.place_upper_right.lat)
            .param("place_centroid_lon", self.place_centroid.lon)
            .param("place_centroid_lat", self.place_centroid.lat)
            .param("mention_ids", mention_ids)
            .param("mention_names", mention_names)
            .param("mention_screen_names", mention_screen_names)
            .param("hashtags", self.hashtags)
    }
}

/// A Neo4j connection.
pub struct GraphStore {
    graph: Option<Graph>,
}

impl GraphStore {
    /// Connects to Neo4j over Bolt.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Graph`] if the configuration is invalid or the
    /// server cannot be reached.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, LoadError> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .build()?;
        let graph = Graph::connect(config).await?;

        log::info!("Connected to Neo4j at {uri}");
        Ok(Self { graph: Some(graph) })
    }

    async fn merge(&self, record: &Record) -> Result<(), LoadError> {
        let graph = self.graph.as_ref().ok_or(LoadError::Closed)?;
        graph
            .run(TweetGraphParams::from_record(record).into_query())
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PersistenceAdapter for GraphStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Graph
    }

    async fn insert_one(&mut self, record: &Record) -> Result<(), LoadError> {
        self.merge(record).await
    }

    async fn insert_many(&mut self, records: &[Record]) -> Vec<LoadFailure> {
        let mut failures = Vec::new();
        for record in records {
            if let Err(e) = self.merge(record).await {
                failures.push(crate::failure(record, &e));
            }
        }
        failures
    }

    async fn close(&mut self) -> Result<(), LoadError> {
        self.graph.take().ok_or(LoadError::Closed)?;
        log::info!("Closed Neo4j connection");
        Ok(())
    }
}
