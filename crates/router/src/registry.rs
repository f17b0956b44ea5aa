use glam::Vec3;
use tokio::sync::mpsc;
use twinsim_common::BodyId;
use twinsim_kernel::BodyOptions;

/// A registry change requested from outside the stepping thread.
#[derive(Debug, Clone)]
pub(crate) enum RegistryOp {
    Register {
        id: BodyId,
        position: Vec3,
        options: BodyOptions,
    },
    Unregister(BodyId),
}

/// Cloneable, `Send` handle for registering bodies from async tasks.
///
/// Operations are queued and applied by the router at the next step
/// boundary, never mid-step.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    tx: mpsc::UnboundedSender<RegistryOp>,
}

impl RegistryHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<RegistryOp>) -> Self {
        Self { tx }
    }

    /// Queue a registration. Returns false if the router is gone.
    pub fn register(&self, id: impl Into<BodyId>, position: Vec3, options: BodyOptions) -> bool {
        self.tx
            .send(RegistryOp::Register {
                id: id.into(),
                position,
                options,
            })
            .is_ok()
    }

    /// Queue a removal. Returns false if the router is gone.
    pub fn unregister(&self, id: impl Into<BodyId>) -> bool {
        self.tx.send(RegistryOp::Unregister(id.into())).is_ok()
    }
}
