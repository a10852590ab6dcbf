//! RediSearch backend over multiplexed async redis connections
//!
//! Speaks the 1.x command set: `FT.CREATE`, `FT.ADD`, `FT.DROP`, `FT.SEARCH`
//! and `FT.INFO`. Batches are pipelined on one connection; connections are
//! picked round-robin across the host list.

use super::{IndexClient, IndexInfo, IndexingOptions, SearchHit, SearchQuery};
use crate::document::{Document, FieldValue};
use crate::errors::ClientError;
use crate::schema::{FieldKind, IndexSchema};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, Cmd, RedisError, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct RediSearchClient {
    index: String,
    hosts: Vec<String>,
    connections: Vec<MultiplexedConnection>,
    next: AtomicUsize,
}

impl RediSearchClient {
    /// Connect to every host in a comma separated `host:port` list
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Connection` for the first host that cannot be
    /// reached.
    pub async fn connect(hosts: &str, index: &str) -> Result<Self, ClientError> {
        let hosts: Vec<String> = hosts
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect();
        if hosts.is_empty() {
            return Err(ClientError::Connection {
                host: String::new(),
                reason: "no hosts given".to_string(),
            });
        }

        let mut connections = Vec::with_capacity(hosts.len());
        for host in &hosts {
            let url = if host.starts_with("redis://") {
                host.clone()
            } else {
                format!("redis://{host}/")
            };
            let connection_error = |e: RedisError| ClientError::Connection {
                host: host.clone(),
                reason: e.to_string(),
            };
            let client = Client::open(url.as_str()).map_err(connection_error)?;
            let conn = client
                .get_multiplexed_async_connection()
                .await
                .map_err(connection_error)?;
            connections.push(conn);
        }

        tracing::info!(index, hosts = ?hosts, "Connected to RediSearch");

        Ok(Self {
            index: index.to_string(),
            hosts,
            connections,
            next: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    fn connection(&self) -> MultiplexedConnection {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        self.connections[i].clone()
    }

    fn map_error(&self, error: RedisError) -> ClientError {
        if error.to_string().contains("Unknown Index name") {
            ClientError::UnknownIndex(self.index.clone())
        } else {
            ClientError::Redis(error)
        }
    }
}

fn push_value(cmd: &mut Cmd, value: &FieldValue) {
    match value {
        FieldValue::Text(s) => cmd.arg(s),
        FieldValue::Integer(i) => cmd.arg(*i),
        FieldValue::Float(f) => cmd.arg(*f),
    };
}

/// `FT.CREATE` arguments for a schema
fn create_command(index: &str, schema: &IndexSchema) -> Cmd {
    let mut cmd = redis::cmd("FT.CREATE");
    cmd.arg(index);
    if schema.options.no_offset_vectors {
        cmd.arg("NOOFFSETS");
    }
    if schema.options.no_frequencies {
        cmd.arg("NOFREQS");
    }
    cmd.arg("SCHEMA");

    for field in &schema.fields {
        cmd.arg(&field.name);
        match field.kind {
            FieldKind::Text {
                sortable,
                no_stem,
                no_index,
            } => {
                cmd.arg("TEXT");
                if no_stem {
                    cmd.arg("NOSTEM");
                }
                if sortable {
                    cmd.arg("SORTABLE");
                }
                if no_index {
                    cmd.arg("NOINDEX");
                }
            }
            FieldKind::Tag => {
                cmd.arg("TAG").arg("SEPARATOR").arg(",");
            }
            FieldKind::Numeric { sortable, no_index } => {
                cmd.arg("NUMERIC");
                if sortable {
                    cmd.arg("SORTABLE");
                }
                if no_index {
                    cmd.arg("NOINDEX");
                }
            }
        }
    }
    cmd
}

/// `FT.ADD` for one document
fn add_command(index: &str, options: &IndexingOptions, doc: &Document) -> Cmd {
    let mut cmd = redis::cmd("FT.ADD");
    cmd.arg(index).arg(&doc.id).arg(doc.score.to_string());
    if options.no_save {
        cmd.arg("NOSAVE");
    }
    if options.replace {
        cmd.arg("REPLACE");
    }
    cmd.arg("FIELDS");
    for (name, value) in doc.fields() {
        cmd.arg(name);
        push_value(&mut cmd, value);
    }
    cmd
}

fn search_command(index: &str, query: &SearchQuery) -> Cmd {
    let mut cmd = redis::cmd("FT.SEARCH");
    cmd.arg(index).arg(&query.text);
    if query.no_content {
        cmd.arg("NOCONTENT");
    }
    if query.verbatim {
        cmd.arg("VERBATIM");
    }
    cmd.arg("LIMIT").arg(query.offset).arg(query.limit);
    cmd
}

/// Parse `[total, id, [field, value, ...], id, ...]`
fn parse_search_reply(reply: &[Value], no_content: bool) -> Result<(Vec<SearchHit>, usize), ClientError> {
    let Some((total, rest)) = reply.split_first() else {
        return Err(ClientError::Search("empty FT.SEARCH reply".to_string()));
    };
    let total: usize = redis::from_redis_value(total)?;

    let step = if no_content { 1 } else { 2 };
    let mut hits = Vec::with_capacity(rest.len() / step);
    for chunk in rest.chunks(step) {
        let id: String = redis::from_redis_value(&chunk[0])?;
        let mut fields = Vec::new();
        if let Some(raw) = chunk.get(1) {
            let flat: Vec<String> = redis::from_redis_value(raw)?;
            for pair in flat.chunks_exact(2) {
                fields.push((pair[0].clone(), FieldValue::Text(pair[1].clone())));
            }
        }
        hits.push(SearchHit { id, fields });
    }
    Ok((hits, total))
}

/// Pull `num_docs` and field names out of the flat `FT.INFO` reply
fn parse_info_reply(index: &str, reply: &[Value]) -> Result<IndexInfo, ClientError> {
    let mut info = IndexInfo {
        name: index.to_string(),
        num_docs: 0,
        fields: Vec::new(),
    };

    for pair in reply.chunks_exact(2) {
        let key: String = redis::from_redis_value(&pair[0])?;
        match key.as_str() {
            "index_name" => info.name = redis::from_redis_value(&pair[1])?,
            "num_docs" => {
                let raw: String = redis::from_redis_value(&pair[1])?;
                info.num_docs = raw.trim().parse::<f64>().map_or(0, |n| n as u64);
            }
            "fields" => {
                let rows: Vec<Vec<Value>> = redis::from_redis_value(&pair[1])?;
                info.fields = rows
                    .iter()
                    .filter_map(|row| row.first())
                    .filter_map(|name| redis::from_redis_value::<String>(name).ok())
                    .collect();
            }
            _ => {}
        }
    }
    Ok(info)
}

#[async_trait]
impl IndexClient for RediSearchClient {
    fn index_name(&self) -> &str {
        &self.index
    }

    async fn create_index(&self, schema: &IndexSchema) -> Result<(), ClientError> {
        let mut conn = self.connection();
        let _: () = create_command(&self.index, schema)
            .query_async(&mut conn)
            .await
            .map_err(|e| ClientError::CreateIndex {
                index: self.index.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn drop_index(&self) -> Result<(), ClientError> {
        let mut conn = self.connection();
        let _: () = redis::cmd("FT.DROP")
            .arg(&self.index)
            .query_async(&mut conn)
            .await
            .map_err(|e| self.map_error(e))?;
        Ok(())
    }

    async fn index_documents(
        &self,
        options: &IndexingOptions,
        docs: &[Document],
    ) -> Result<(), ClientError> {
        if docs.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for doc in docs {
            pipe.add_command(add_command(&self.index, options, doc)).ignore();
        }

        let mut conn = self.connection();
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| self.map_error(e))?;
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<(Vec<SearchHit>, usize), ClientError> {
        let mut conn = self.connection();
        let reply: Vec<Value> = search_command(&self.index, query)
            .query_async(&mut conn)
            .await
            .map_err(|e| self.map_error(e))?;
        parse_search_reply(&reply, query.no_content)
    }

    async fn info(&self) -> Result<IndexInfo, ClientError> {
        let mut conn = self.connection();
        let reply: Vec<Value> = redis::cmd("FT.INFO")
            .arg(&self.index)
            .query_async(&mut conn)
            .await
            .map_err(|e| self.map_error(e))?;
        parse_info_reply(&self.index, &reply)
    }
}
