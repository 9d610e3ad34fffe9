use tracing::{error, info, warn};

use super::dispatch::{WriteDispatcher, WriteReport};
use crate::config::ServiceIds;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    PoweringOn,
    ServiceRegistered,
    Advertising,
    Active,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteRequest {
    pub central: Option<String>,
    pub characteristic: String,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    PowerChanged { powered_on: bool },
    ServiceAdded(Result<(), String>),
    AdvertisingStarted(Result<(), String>),
    ReadRequested,
    WriteReceived(WriteRequest),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkAction {
    None,
    AddService(ServiceIds),
    StartAdvertising { name: String, service: String },
    RespondRead(Vec<u8>),
    Dispatched(Box<WriteReport>),
}

pub struct Peripheral {
    state: LinkState,
    ids: ServiceIds,
    dispatcher: WriteDispatcher,
}

impl Peripheral {
    pub fn new(ids: ServiceIds, dispatcher: WriteDispatcher) -> Self {
        Self {
            state: LinkState::PoweringOn,
            ids,
            dispatcher,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn dispatcher(&self) -> &WriteDispatcher {
        &self.dispatcher
    }

    pub fn handle(&mut self, event: LinkEvent) -> LinkAction {
        match event {
            LinkEvent::PowerChanged { powered_on: false } => {
                warn!(state = ?self.state, "BLE not ready");
                self.state = LinkState::PoweringOn;
                LinkAction::None
            }
            LinkEvent::PowerChanged { powered_on: true } => {
                if self.state != LinkState::PoweringOn {
                    return LinkAction::None;
                }
                info!(service = %self.ids.service, "BLE powered on, adding service");
                LinkAction::AddService(self.ids.clone())
            }
            LinkEvent::ServiceAdded(Err(e)) => {
                error!(error = %e, "addService failed");
                LinkAction::None
            }
            LinkEvent::ServiceAdded(Ok(())) => {
                self.state = LinkState::ServiceRegistered;
                info!(
                    name = %self.ids.name,
                    service = %self.ids.service,
                    cmd = %self.ids.command,
                    data = %self.ids.data,
                    "Advertising"
                );
                LinkAction::StartAdvertising {
                    name: self.ids.name.clone(),
                    service: self.ids.service.clone(),
                }
            }
            LinkEvent::AdvertisingStarted(Err(e)) => {
                error!(error = %e, "startAdvertising failed");
                LinkAction::None
            }
            LinkEvent::AdvertisingStarted(Ok(())) => {
                self.state = LinkState::Advertising;
                info!("Advertising started, waiting for writes");
                LinkAction::None
            }
            LinkEvent::ReadRequested => LinkAction::RespondRead(Vec::new()),
            LinkEvent::WriteReceived(req) => self.on_write(req),
        }
    }

    fn on_write(&mut self, req: WriteRequest) -> LinkAction {
        if !matches!(self.state, LinkState::Advertising | LinkState::Active) {
            warn!(state = ?self.state, len = req.data.len(), "Write before advertising, ignored");
            return LinkAction::None;
        }
        self.state = LinkState::Active;
        let mut report = self
            .dispatcher
            .on_write_received(&req.characteristic, &req.data);
        report.central = req.central;
        info!(
            central = report.central.as_deref().unwrap_or("?"),
            characteristic = %req.characteristic,
            channel = %report.channel,
            len = report.len,
            "Write received"
        );
        LinkAction::Dispatched(Box::new(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::AsciiRenderer;
    use crate::config::{BitmapMode, DumpOptions};
    use crate::peripheral::dispatch::Channel;

    fn peripheral() -> Peripheral {
        let ids = ServiceIds::default();
        let dispatcher = WriteDispatcher::new(
            ids.clone(),
            DumpOptions::default(),
            BitmapMode::Off,
            AsciiRenderer::default(),
        );
        Peripheral::new(ids, dispatcher)
    }

    fn write(data: &[u8]) -> LinkEvent {
        LinkEvent::WriteReceived(WriteRequest {
            central: Some("central-1".into()),
            characteristic: "FFF1".into(),
            data: data.to_vec(),
        })
    }

    fn bring_up(p: &mut Peripheral) {
        assert!(matches!(
            p.handle(LinkEvent::PowerChanged { powered_on: true }),
            LinkAction::AddService(_)
        ));
        assert!(matches!(
            p.handle(LinkEvent::ServiceAdded(Ok(()))),
            LinkAction::StartAdvertising { .. }
        ));
        assert_eq!(p.state(), LinkState::ServiceRegistered);
        assert_eq!(
            p.handle(LinkEvent::AdvertisingStarted(Ok(()))),
            LinkAction::None
        );
        assert_eq!(p.state(), LinkState::Advertising);
    }

    #[test]
    fn walks_through_lifecycle() {
        let mut p = peripheral();
        assert_eq!(p.state(), LinkState::PoweringOn);
        bring_up(&mut p);

        let LinkAction::Dispatched(report) = p.handle(write(b"PING")) else {
            panic!("write should be dispatched");
        };
        assert_eq!(report.channel, Channel::Command);
        assert_eq!(report.central.as_deref(), Some("central-1"));
        assert_eq!(p.state(), LinkState::Active);
    }

    #[test]
    fn writes_before_advertising_are_ignored() {
        let mut p = peripheral();
        assert_eq!(p.handle(write(b"x")), LinkAction::None);
        assert_eq!(p.dispatcher().writes(), 0);
    }

    #[test]
    fn power_loss_resets_to_powering_on() {
        let mut p = peripheral();
        bring_up(&mut p);
        p.handle(LinkEvent::PowerChanged { powered_on: false });
        assert_eq!(p.state(), LinkState::PoweringOn);
        assert_eq!(p.handle(write(b"x")), LinkAction::None);
    }

    #[test]
    fn failed_service_registration_stays_put() {
        let mut p = peripheral();
        p.handle(LinkEvent::PowerChanged { powered_on: true });
        p.handle(LinkEvent::ServiceAdded(Err("busy".into())));
        assert_eq!(p.state(), LinkState::PoweringOn);
    }

    #[test]
    fn reads_answer_empty() {
        let mut p = peripheral();
        assert_eq!(
            p.handle(LinkEvent::ReadRequested),
            LinkAction::RespondRead(Vec::new())
        );
    }
}
