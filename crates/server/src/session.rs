//! One client's transfer session.
//!
//! A session authenticates once, then accepts at most one upload: an
//! upload-start, any number of blocks, and a finish carrying the client's
//! checksum. Every request is an [`Envelope`] followed by its payload. A
//! successful step is answered with a "continue" status; the first error
//! is answered with an error status and ends the session. Authentication
//! success is not acknowledged.

use std::sync::Arc;

use futures_util::{Sink, Stream};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_util::sync::CancellationToken;

use mcft_protocol::{
    AuthenticateRequest, Envelope, FileBlockRequest, FinishUploadRequest, RequestType,
    StatusResponse, UploadFileRequest,
};
use mcft_store::{NewFile, Project, StoreError, User};
use mcft_transfer::{BlockWriter, LogicalPath};

use crate::SessionError;
use crate::connection::Connection;
use crate::context::Services;
use crate::conversion::mime_type_for;
use crate::finalize::{OpenUpload, Teardown, finalize_upload};

/// Where a live session is in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    FileOpen,
}

/// How a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client sent a finish; `checksum_matched` is the comparison result.
    Finished { checksum_matched: bool },
    /// The client went away between requests.
    Disconnected,
    /// The server is shutting down.
    Cancelled,
}

/// Outcome of [`Session::run`].
#[derive(Debug)]
pub struct SessionReport {
    pub result: Result<SessionEnd, SessionError>,
    pub teardown: Teardown,
}

struct Identity {
    user: User,
    project: Project,
}

pub struct Session<S> {
    conn: Connection<S>,
    services: Arc<Services>,
    cancel: CancellationToken,
    identity: Option<Identity>,
    upload: Option<OpenUpload>,
}

impl<S> Session<S>
where
    S: Stream<Item = Result<WsMessage, WsError>> + Sink<WsMessage, Error = WsError> + Unpin,
{
    pub fn new(stream: S, services: Arc<Services>, cancel: CancellationToken) -> Self {
        Self {
            conn: Connection::new(stream),
            services,
            cancel,
            identity: None,
            upload: None,
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.identity, &self.upload) {
            (None, _) => SessionState::Unauthenticated,
            (Some(_), None) => SessionState::Authenticated,
            (Some(_), Some(_)) => SessionState::FileOpen,
        }
    }

    /// Runs the session to completion.
    ///
    /// The open file, if any, is finalized before this returns, on every
    /// exit path.
    pub async fn run(mut self) -> SessionReport {
        let result = self.drive().await;

        let teardown = match self.upload.take() {
            Some(upload) => finalize_upload(&self.services, upload).await,
            None => Teardown::NoUpload,
        };
        self.conn.close().await;

        SessionReport { result, teardown }
    }

    async fn drive(&mut self) -> Result<SessionEnd, SessionError> {
        if let Err(e) = self.authenticate().await {
            self.report(&e, Some(RequestType::Authenticate)).await;
            return Err(e);
        }

        loop {
            let envelope = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(SessionEnd::Cancelled),
                read = self.conn.read_json::<Envelope>() => match read {
                    Ok(envelope) => envelope,
                    Err(SessionError::Disconnected) => return Ok(SessionEnd::Disconnected),
                    Err(e) => return Err(e),
                },
            };

            let request_type = match envelope.request_type() {
                Ok(request_type) => request_type,
                Err(_) => {
                    let e = SessionError::UnknownRequestType(envelope.request_type);
                    self.report(&e, None).await;
                    return Err(e);
                }
            };
            tracing::debug!(request = %request_type, state = ?self.state(), "request");

            let step = match request_type {
                RequestType::Authenticate => Err(SessionError::AlreadyAuthenticated),
                RequestType::UploadFile => self.start_upload().await,
                RequestType::FileBlock => self.accept_block().await,
                RequestType::FinishUpload => return self.finish_upload().await,
                RequestType::Download
                | RequestType::FileInfo
                | RequestType::ListDirectory
                | RequestType::PauseUpload
                | RequestType::ServerInfo
                | RequestType::ServerConnect => {
                    Err(SessionError::UnknownRequestType(request_type.code()))
                }
            };

            match step {
                Ok(()) => {
                    let status = StatusResponse::proceed().for_request(request_type);
                    self.conn.write_json(&status).await?;
                }
                Err(e) => {
                    self.report(&e, Some(request_type)).await;
                    return Err(e);
                }
            }
        }
    }

    async fn authenticate(&mut self) -> Result<(), SessionError> {
        let envelope: Envelope = self.conn.read_json().await?;
        if envelope.request_type != RequestType::Authenticate.code() {
            return Err(SessionError::NotAuthenticated);
        }
        let request: AuthenticateRequest = self.conn.read_json().await?;

        let store = &self.services.store;
        let user = match store.find_user_by_api_token(&request.apitoken).await {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => return Err(SessionError::InvalidToken),
            Err(e) => return Err(e.into()),
        };
        if !store.user_can_access_project(user.id, request.project_id).await? {
            return Err(SessionError::AccessDenied {
                user_id: user.id,
                project_id: request.project_id,
            });
        }
        let project = store.find_project(request.project_id).await?;

        tracing::info!(user = %user.name, project_id = project.id, "session authenticated");
        self.identity = Some(Identity { user, project });
        Ok(())
    }

    fn identity_ids(&self) -> Result<(i64, i64), SessionError> {
        self.identity
            .as_ref()
            .map(|id| (id.user.id, id.project.id))
            .ok_or(SessionError::NotAuthenticated)
    }

    async fn start_upload(&mut self) -> Result<(), SessionError> {
        let (user_id, project_id) = self.identity_ids()?;
        if self.upload.is_some() {
            return Err(SessionError::BadProtocolSequence("upload already in progress"));
        }
        let request: UploadFileRequest = self.conn.read_json().await?;

        let path = LogicalPath::parse(&request.path)?;
        let dir = self
            .services
            .resolver
            .resolve(project_id, user_id, path.dir())
            .await?;

        let full_path = path.to_string();
        let mime_type = mime_type_for(path.file_name());
        let record = self
            .services
            .store
            .create_file(NewFile {
                project_id,
                directory_id: dir.id,
                owner_id: user_id,
                name: path.file_name(),
                path: &full_path,
                mime_type: &mime_type,
            })
            .await?;

        let target = self.services.layout.path_for(&record.uuid)?;
        let writer = BlockWriter::create(target).await?;

        tracing::info!(
            file_id = record.id,
            path = %full_path,
            %mime_type,
            declared_size = request.size,
            "upload started"
        );
        self.upload = Some(OpenUpload { record, writer });
        Ok(())
    }

    async fn accept_block(&mut self) -> Result<(), SessionError> {
        // Checked before the payload is read.
        let Some(upload) = self.upload.as_mut() else {
            return Err(SessionError::BadProtocolSequence("no file open"));
        };
        let request: FileBlockRequest = self.conn.read_json().await?;
        upload.writer.write_block(&request.block).await?;
        tracing::trace!(
            file_id = upload.record.id,
            block = request.block.len(),
            total = upload.writer.bytes_written(),
            "block written"
        );
        Ok(())
    }

    async fn finish_upload(&mut self) -> Result<SessionEnd, SessionError> {
        match self.compare_checksums().await {
            Ok(status) => {
                let checksum_matched = !status.is_error;
                self.conn.write_json(&status).await?;
                Ok(SessionEnd::Finished { checksum_matched })
            }
            Err(e) => {
                self.report(&e, Some(RequestType::FinishUpload)).await;
                Err(e)
            }
        }
    }

    async fn compare_checksums(&mut self) -> Result<StatusResponse, SessionError> {
        let Some(upload) = self.upload.as_ref() else {
            return Err(SessionError::BadProtocolSequence("no file open"));
        };
        let request: FinishUploadRequest = self.conn.read_json().await?;

        let computed = upload.writer.checksum();
        if computed != request.file_checksum {
            tracing::warn!(
                file_id = upload.record.id,
                %computed,
                expected = %request.file_checksum,
                "checksum mismatch"
            );
        }
        Ok(StatusResponse::checksum_result(&computed, &request.file_checksum)
            .for_request(RequestType::FinishUpload))
    }

    /// Tells the client about `error`, if it can still hear it.
    async fn report(&mut self, error: &SessionError, request_type: Option<RequestType>) {
        tracing::warn!(kind = ?error.kind(), state = ?self.state(), "session error: {error}");
        if !error.is_reportable() {
            return;
        }

        let mut status = StatusResponse::error(error.to_string());
        if let Some(request_type) = request_type {
            status = status.for_request(request_type);
        }
        if let Err(e) = self.conn.write_json(&status).await {
            tracing::debug!("could not send error status: {e}");
        }
    }
}
