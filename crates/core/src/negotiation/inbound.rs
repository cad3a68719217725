use super::{Negotiator, SINK_METHODS};
use crate::dispatcher::Command;
use crate::error::Result;
use crate::protocol::{Method, RtspMessage, RtspRequest, RtspResponse, WFD_TAG};
use crate::sink::SinkEvent;
use crate::wfd::formats::{select_audio, select_video};
use crate::wfd::{CONTENT_TYPE, ClientRtpPorts, I2c, TriggerMethod, WfdMessage};

impl Negotiator {
    /// Answer one request from the source (M1, M3, M4, M5, M16).
    ///
    /// A trigger is acted on only after its 200 OK went out.
    pub(super) fn handle_request(&mut self, request: RtspRequest) -> Result<()> {
        let Some(cseq) = request.get_header("CSeq").map(str::to_string) else {
            tracing::warn!(method = %request.method, "request without CSeq");
            return self.reply(RtspResponse::bad_request(), "0");
        };

        if let Some(tag) = request
            .get_header("Require")
            .filter(|tag| !tag.split(',').all(|t| t.trim() == WFD_TAG))
        {
            tracing::warn!(require = tag, "unsupported Require tag");
            let response = RtspResponse::option_not_supported().add_header("Unsupported", tag);
            return self.reply(response, &cseq);
        }

        let answered = match request.method_kind() {
            Some(Method::Options) => Ok((self.answer_options(), None)),
            Some(Method::GetParameter) => self.answer_get_parameter(&request).map(|r| (r, None)),
            Some(Method::SetParameter) => Ok(self.apply_set_parameter(&request)),
            Some(method) => {
                tracing::warn!(method = method.as_str(), "method not allowed on the sink");
                let response = RtspResponse::new(405, "Method Not Allowed")
                    .add_header("Allow", &SINK_METHODS.to_header_value(false));
                Ok((response, None))
            }
            None => {
                tracing::warn!(method = %request.method, "unknown RTSP method");
                Ok((RtspResponse::not_implemented(), None))
            }
        };

        match answered {
            Ok((response, trigger)) => {
                self.reply(response, &cseq)?;
                if let Some(trigger) = trigger {
                    self.dispatch_trigger(trigger);
                }
                Ok(())
            }
            Err(e) => {
                // The source still gets an answer before the error surfaces.
                self.reply(RtspResponse::internal_error(), &cseq)?;
                Err(e)
            }
        }
    }

    fn reply(&mut self, response: RtspResponse, cseq: &str) -> Result<()> {
        let response = response
            .add_header("CSeq", cseq)
            .add_header("Server", &self.config.user_agent);
        self.transport
            .send(&RtspMessage::Response(response), self.config.io_timeout)
    }

    fn answer_options(&self) -> RtspResponse {
        tracing::debug!("OPTIONS from source");
        RtspResponse::ok().add_header("Public", &SINK_METHODS.to_header_value(true))
    }

    /// M3 capability query, or M16 keep-alive when the body is empty.
    fn answer_get_parameter(&mut self, request: &RtspRequest) -> Result<RtspResponse> {
        if request.body.trim().is_empty() {
            tracing::trace!("keep-alive");
            let grace = self.config.keepalive_grace;
            self.shared.with_session(|s| s.touch_keepalive(grace));
            return Ok(RtspResponse::ok());
        }

        let query = WfdMessage::parse(request.body.as_bytes());
        tracing::debug!(params = ?query.parameter_names(), "capability query");

        let config = &self.config;
        let mut reply = WfdMessage::new();
        if query.audio_codecs.is_some() {
            reply.audio_codecs = Some(config.audio_codecs.clone());
        }
        if query.video_formats.is_some() {
            reply.video_formats = Some(config.video_formats.clone());
        }
        if query.video_3d_formats.is_some() {
            reply.video_3d_formats = Some(config.video_3d_formats.clone());
        }
        if query.content_protection.is_some() {
            reply.content_protection = Some(config.content_protection());
        }
        if query.display_edid.is_some() {
            reply.display_edid = Some(config.edid.clone().unwrap_or_default());
        }
        if query.coupled_sink.is_some() {
            reply.coupled_sink = Some(config.coupled_sink);
        }
        if query.i2c.is_some() {
            reply.i2c = Some(I2c::default());
        }
        if query.standby_resume_capability.is_some() {
            reply.standby_resume_capability = Some(config.standby_resume_capability());
        }
        if query.connector_type.is_some() {
            reply.connector_type = Some(config.connector());
        }
        if query.preferred_display_mode.is_some() {
            reply.preferred_display_mode = Some(Default::default());
        }
        if query.client_rtp_ports.is_some() {
            let (rtp_port, _) = self.local_ports()?;
            reply.client_rtp_ports = Some(ClientRtpPorts::udp(rtp_port, 0));
        }

        Ok(RtspResponse::ok().with_body(CONTENT_TYPE, reply.serialize()))
    }

    /// M4 and M5. Returns the response and the trigger to act on once it
    /// was sent.
    fn apply_set_parameter(&mut self, request: &RtspRequest) -> (RtspResponse, Option<TriggerMethod>) {
        let msg = WfdMessage::parse(request.body.as_bytes());
        tracing::debug!(params = ?msg.parameter_names(), "parameters from source");

        let audio = msg.audio_codecs.as_ref().and_then(select_audio);
        let video = msg.video_formats.as_ref().and_then(select_video);
        if msg.audio_codecs.is_some() && audio.is_none() {
            tracing::warn!("no usable audio codec offered");
        }
        if msg.video_formats.is_some() && video.is_none() {
            tracing::warn!("no usable video format offered");
        }

        let updated = self.shared.with_session(|s| {
            s.merge_peer_params(&msg);
            if let Some(url) = msg.presentation_url.as_ref().and_then(|u| u.url0.clone()) {
                s.control_url = Some(url);
            }
            if let Some(ports) = &msg.client_rtp_ports {
                s.client_ports = Some(ports.clone());
            }
            if let Some(route) = msg.route {
                s.route = Some(route);
            }
            if msg.standby {
                s.standby = true;
            }
            if audio.is_some() {
                s.stream_info.audio = audio;
            }
            if video.is_some() {
                s.stream_info.video = video;
            }
            (audio.is_some() || video.is_some()).then_some(s.stream_info)
        });

        if let Some(info) = updated {
            tracing::info!(audio = ?info.audio, video = ?info.video, "stream info updated");
            self.sink.stream_info_updated(&info);
        }
        if let Some(timing) = &msg.av_format_change_timing {
            tracing::debug!(pts = timing.pts, dts = timing.dts, "A/V format change");
            self.sink.push_event(SinkEvent::FlushStart);
            self.sink.av_format_changing(timing);
            self.sink.push_event(SinkEvent::FlushStop);
        }
        if msg.standby {
            tracing::info!("source entered standby");
        }

        (RtspResponse::ok(), msg.trigger_method)
    }

    fn dispatch_trigger(&mut self, trigger: TriggerMethod) {
        tracing::debug!(trigger = trigger.as_str(), "trigger from source");
        let command = match trigger {
            TriggerMethod::Setup if self.in_open => {
                self.setup_requested = true;
                return;
            }
            TriggerMethod::Setup => Command::Setup,
            TriggerMethod::Play => Command::Play,
            TriggerMethod::Pause => Command::Pause,
            TriggerMethod::Teardown => Command::Close,
        };
        self.shared.enqueue(command);
    }
}
