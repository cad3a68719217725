use std::time::Instant;

use super::Negotiator;
use crate::error::{Result, WfdError};
use crate::protocol::{Method, RtspMessage, RtspRequest, RtspResponse};

impl Negotiator {
    /// Outbound request with CSeq, User-Agent and, once SETUP assigned
    /// one, Session.
    pub(super) fn request(&mut self, method: Method, uri: &str) -> RtspRequest {
        let cseq = self.transport.next_cseq();
        let request = RtspRequest::new(method, uri)
            .add_header("CSeq", &cseq.to_string())
            .add_header("User-Agent", &self.config.user_agent);
        match self.shared.with_session(|s| s.header_value().map(str::to_string)) {
            Some(id) => request.add_header("Session", &id),
            None => request,
        }
    }

    /// Send `request` and wait for the matching response.
    ///
    /// Requests from the source arriving in the meantime are served
    /// inline. Responses carrying another CSeq are skipped. The status
    /// code is returned as-is.
    pub(super) fn try_exchange(&mut self, request: RtspRequest) -> Result<RtspResponse> {
        let cseq = request.cseq();
        let timeout = self.config.io_timeout;
        self.transport
            .send(&RtspMessage::Request(request), timeout)?;

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(WfdError::Timeout);
            }
            match self.transport.receive(remaining)? {
                RtspMessage::Request(inbound) => self.handle_request(inbound)?,
                RtspMessage::Response(response) => {
                    if cseq.is_some() && response.cseq() != cseq {
                        tracing::warn!(
                            expected = ?cseq,
                            got = ?response.cseq(),
                            "skipping response with foreign CSeq"
                        );
                        continue;
                    }
                    return Ok(response);
                }
            }
        }
    }

    /// [`Self::try_exchange`], then turn any status other than 200 into an
    /// error.
    ///
    /// 404, 405 and 501 mean the source does not implement `method`: it
    /// is removed from the source's method set and
    /// [`WfdError::NotSupported`] is returned.
    pub(super) fn send(&mut self, method: Method, request: RtspRequest) -> Result<RtspResponse> {
        let response = self.try_exchange(request)?;
        if response.is_success() {
            return Ok(response);
        }
        match response.status_code {
            404 | 405 | 501 => {
                tracing::warn!(
                    method = method.as_str(),
                    status = response.status_code,
                    "source rejected method"
                );
                self.shared.with_session(|s| s.methods.remove(method.flag()));
                Err(WfdError::NotSupported(method.as_str()))
            }
            code => Err(WfdError::Status {
                code,
                reason: response.status_text,
            }),
        }
    }
}
