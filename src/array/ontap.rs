//! OntapArray - NetApp ONTAP через ZAPI (XML over HTTP(S), basic auth).
//!
//! Каждая операция - один POST на /servlets/netapp.servlets.admin.XMLrequest_filer.
//! Ответ `results status="failed"` классифицируется по тексту reason в `FaultKind`.

use anyhow::{anyhow, Context, Result};
use log::{debug, trace, warn};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

use super::zapi::{envelope, parse_reply, ZapiElement, ZapiReply};
use super::{ArrayFault, ArrayResult, FaultKind, LunPath, StorageArray};
use crate::config::ArrayConfig;
use crate::store::Credentials;

pub const ZAPI_SERVLET: &str = "/servlets/netapp.servlets.admin.XMLrequest_filer";
const ZAPI_MAJOR: u32 = 1;
const ZAPI_MINOR: u32 = 7;

pub struct OntapArray {
    client: Client,
    url: String,
    login: Credentials,
    vserver: Option<String>,
}

impl OntapArray {
    pub fn connect(cfg: &ArrayConfig, login: Credentials) -> Result<Self> {
        let timeout = cfg.timeout_secs.map(Duration::from_secs);
        let client = Client::builder()
            .danger_accept_invalid_certs(cfg.accept_invalid_certs)
            .timeout(timeout)
            .build()
            .context("build zapi http client")?;
        let url = format!(
            "{}://{}:{}{}",
            cfg.transport, cfg.address, cfg.port, ZAPI_SERVLET
        );
        debug!("ontap: zapi endpoint {}", url);
        Ok(Self {
            client,
            url,
            login,
            vserver: cfg.vserver.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn post(&self, body: String) -> Result<String> {
        let resp = self
            .client
            .post(&self.url)
            .basic_auth(&self.login.user, Some(&self.login.password))
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(body)
            .send()
            .with_context(|| format!("POST {}", self.url))?
            .error_for_status()
            .map_err(|e| anyhow!("zapi http status: {}", e))?;
        resp.text().context("read zapi reply body")
    }

    /// Run one API call; failed replies become classified faults.
    fn invoke(&self, api: ZapiElement) -> ArrayResult<ZapiReply> {
        let op = api.name().to_string();
        let body = envelope(&api, ZAPI_MAJOR, ZAPI_MINOR, self.vserver.as_deref());
        trace!("zapi request: {}", body);

        let text = self
            .post(body)
            .map_err(|e| ArrayFault::transport(&op, format!("{:#}", e)))?;
        let reply = parse_reply(&text).map_err(|e| ArrayFault::transport(&op, format!("{:#}", e)))?;
        if reply.passed() {
            return Ok(reply);
        }
        let reason = match reply.errno() {
            Some(errno) => format!("{} (errno {})", reply.reason(), errno),
            None => reply.reason().to_string(),
        };
        Err(ArrayFault::new(&op, classify(reply.reason()), reason))
    }

    /// `lun-get-iter` with a single `lun-info` query field; returns the first match.
    fn lun_lookup(&self, field: &str, value: &str, want: &str) -> ArrayResult<Option<String>> {
        let api = ZapiElement::new("lun-get-iter").with_child(
            ZapiElement::new("query")
                .with_child(ZapiElement::new("lun-info").with_text_child(field, value)),
        );
        let reply = self.invoke(api)?;
        Ok(reply
            .results()
            .child("attributes-list")
            .and_then(|l| l.child("lun-info"))
            .and_then(|info| info.child_text(want))
            .map(|s| s.to_string()))
    }
}

/// Map reply reason text onto a fault kind.
pub fn classify(reason: &str) -> FaultKind {
    let r = reason.to_ascii_lowercase();
    if r.contains("already exists") || r.contains("already mapped") {
        FaultKind::AlreadyExists
    } else if r.contains("is not currently offline") || r.contains("already online") {
        FaultKind::AlreadyOnline
    } else if r.contains("already offline") || r.contains("is not currently online") {
        FaultKind::AlreadyOffline
    } else if r.contains("not found") || r.contains("does not exist") || r.contains("no such") {
        FaultKind::NotFound
    } else {
        FaultKind::Other
    }
}

impl StorageArray for OntapArray {
    fn kind(&self) -> &'static str {
        "ontap"
    }

    fn resolve_path(&self, serial: &str) -> ArrayResult<Option<LunPath>> {
        let Some(path) = self.lun_lookup("serial-number", serial, "path")? else {
            return Ok(None);
        };
        let parsed = LunPath::parse(&path);
        if parsed.is_none() {
            warn!("ontap: could not find volume for path {}", path);
        }
        Ok(parsed)
    }

    fn resolve_serial(&self, path: &LunPath) -> ArrayResult<Option<String>> {
        self.lun_lookup("path", &path.to_string(), "serial-number")
    }

    fn create_snapshot(&self, volume: &str, name: &str) -> ArrayResult<()> {
        let api = ZapiElement::new("snapshot-create")
            .with_text_child("snapshot", name)
            .with_text_child("volume", volume);
        self.invoke(api).map(|_| ())
    }

    fn delete_snapshot(&self, volume: &str, name: &str) -> ArrayResult<()> {
        let api = ZapiElement::new("snapshot-delete")
            .with_text_child("snapshot", name)
            .with_text_child("volume", volume);
        self.invoke(api).map(|_| ())
    }

    fn clone_volume(&self, parent_volume: &str, parent_snapshot: &str, clone_volume: &str) -> ArrayResult<()> {
        let api = ZapiElement::new("volume-clone-create")
            .with_text_child("parent-snapshot", parent_snapshot)
            .with_text_child("parent-volume", parent_volume)
            .with_text_child("space-reserve", "none")
            .with_text_child("volume", clone_volume);
        self.invoke(api).map(|_| ())
    }

    fn map_lun(&self, path: &LunPath, access_group: &str) -> ArrayResult<()> {
        let api = ZapiElement::new("lun-map")
            .with_text_child("initiator-group", access_group)
            .with_text_child("path", &path.to_string());
        self.invoke(api).map(|_| ())
    }

    fn online_lun(&self, path: &LunPath) -> ArrayResult<()> {
        let api = ZapiElement::new("lun-online").with_text_child("path", &path.to_string());
        self.invoke(api).map(|_| ())
    }

    fn offline_volume(&self, volume: &str) -> ArrayResult<()> {
        let api = ZapiElement::new("volume-offline").with_text_child("name", volume);
        self.invoke(api).map(|_| ())
    }

    fn destroy_volume(&self, volume: &str) -> ArrayResult<()> {
        let api = ZapiElement::new("volume-destroy").with_text_child("name", volume);
        self.invoke(api).map(|_| ())
    }
}
