//! Off-screen render target layout.
//!
//! Each framebuffer group is described by attachment specs and validated
//! before any backend allocates memory for it. Backends only ever allocate
//! from a validated [`RenderTargetSet`].

use std::fmt;

use crate::error::RenderError;

/// Maximum color attachments per group (wgpu's default limit).
pub const MAX_COLOR_ATTACHMENTS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgba16Float,
    Rgba8Unorm,
    Depth24PlusStencil8,
}

impl PixelFormat {
    pub fn is_depth(self) -> bool {
        matches!(self, Self::Depth24PlusStencil8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentRole {
    Normal,
    Albedo,
    Specular,
    DepthStencil,
    LitColor,
    ReflectionColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentSlot {
    Color(u32),
    DepthStencil,
}

impl fmt::Display for AttachmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color(i) => write!(f, "color{i}"),
            Self::DepthStencil => write!(f, "depth-stencil"),
        }
    }
}

/// Whether a pass may write the attachment. The SSR group reads the
/// geometry pass depth-stencil without modifying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentAccess {
    ReadWrite,
    ReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentSpec {
    pub role: AttachmentRole,
    pub format: PixelFormat,
    pub filter: FilterMode,
    pub slot: AttachmentSlot,
    pub access: AttachmentAccess,
    pub width: u32,
    pub height: u32,
}

impl AttachmentSpec {
    pub fn color(role: AttachmentRole, format: PixelFormat, index: u32, width: u32, height: u32) -> Self {
        Self {
            role,
            format,
            filter: FilterMode::Nearest,
            slot: AttachmentSlot::Color(index),
            access: AttachmentAccess::ReadWrite,
            width,
            height,
        }
    }

    pub fn depth_stencil(width: u32, height: u32, access: AttachmentAccess) -> Self {
        Self {
            role: AttachmentRole::DepthStencil,
            format: PixelFormat::Depth24PlusStencil8,
            filter: FilterMode::Nearest,
            slot: AttachmentSlot::DepthStencil,
            access,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferKind {
    Geometry,
    Lighting,
    Ssr,
}

impl FramebufferKind {
    pub fn required_roles(self) -> &'static [AttachmentRole] {
        use AttachmentRole::*;
        match self {
            Self::Geometry => &[Normal, Albedo, Specular, DepthStencil],
            Self::Lighting => &[LitColor],
            Self::Ssr => &[ReflectionColor, DepthStencil],
        }
    }
}

/// Why a framebuffer group failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramebufferIssue {
    #[error("missing {0:?} attachment")]
    MissingAttachment(AttachmentRole),
    #[error("{0:?} attachment does not belong to this group")]
    UnexpectedAttachment(AttachmentRole),
    #[error("{0:?} attachment declared twice")]
    DuplicateRole(AttachmentRole),
    #[error("slot {0} used by more than one attachment")]
    DuplicateSlot(AttachmentSlot),
    #[error("slot {0} exceeds the color attachment limit")]
    SlotOutOfRange(AttachmentSlot),
    #[error("{role:?} has format {format:?}, which cannot be bound to slot {slot}")]
    FormatSlotMismatch {
        role: AttachmentRole,
        format: PixelFormat,
        slot: AttachmentSlot,
    },
    #[error("{0:?} attachment has zero size")]
    ZeroSize(AttachmentRole),
    #[error("{role:?} is {found_width}x{found_height}, expected {width}x{height}")]
    SizeMismatch {
        role: AttachmentRole,
        width: u32,
        height: u32,
        found_width: u32,
        found_height: u32,
    },
}

/// A validated set of attachments for one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FramebufferGroup {
    pub kind: FramebufferKind,
    pub width: u32,
    pub height: u32,
    attachments: Vec<AttachmentSpec>,
}

impl FramebufferGroup {
    pub fn attachment(&self, role: AttachmentRole) -> Option<&AttachmentSpec> {
        self.attachments.iter().find(|a| a.role == role)
    }

    /// Color attachments ordered by slot index.
    pub fn color_attachments(&self) -> Vec<&AttachmentSpec> {
        let mut colors: Vec<_> = self
            .attachments
            .iter()
            .filter(|a| matches!(a.slot, AttachmentSlot::Color(_)))
            .collect();
        colors.sort_by_key(|a| match a.slot {
            AttachmentSlot::Color(i) => i,
            AttachmentSlot::DepthStencil => u32::MAX,
        });
        colors
    }

    pub fn depth_stencil(&self) -> Option<&AttachmentSpec> {
        self.attachments
            .iter()
            .find(|a| a.slot == AttachmentSlot::DepthStencil)
    }
}

/// Validate `specs` as a `kind` group.
pub fn create_framebuffer_group(
    kind: FramebufferKind,
    specs: &[AttachmentSpec],
) -> Result<FramebufferGroup, RenderError> {
    let fail = |issue| RenderError::IncompleteFramebuffer { kind, issue };
    let required = kind.required_roles();

    for (i, spec) in specs.iter().enumerate() {
        if !required.contains(&spec.role) {
            return Err(fail(FramebufferIssue::UnexpectedAttachment(spec.role)));
        }
        if specs[..i].iter().any(|s| s.role == spec.role) {
            return Err(fail(FramebufferIssue::DuplicateRole(spec.role)));
        }
        if specs[..i].iter().any(|s| s.slot == spec.slot) {
            return Err(fail(FramebufferIssue::DuplicateSlot(spec.slot)));
        }
        match spec.slot {
            AttachmentSlot::Color(index) if index >= MAX_COLOR_ATTACHMENTS => {
                return Err(fail(FramebufferIssue::SlotOutOfRange(spec.slot)));
            }
            AttachmentSlot::Color(_) if spec.format.is_depth() => {
                return Err(fail(FramebufferIssue::FormatSlotMismatch {
                    role: spec.role,
                    format: spec.format,
                    slot: spec.slot,
                }));
            }
            AttachmentSlot::DepthStencil if !spec.format.is_depth() => {
                return Err(fail(FramebufferIssue::FormatSlotMismatch {
                    role: spec.role,
                    format: spec.format,
                    slot: spec.slot,
                }));
            }
            _ => {}
        }
        if spec.width == 0 || spec.height == 0 {
            return Err(fail(FramebufferIssue::ZeroSize(spec.role)));
        }
    }

    if let Some(role) = required
        .iter()
        .find(|role| !specs.iter().any(|s| s.role == **role))
    {
        return Err(fail(FramebufferIssue::MissingAttachment(*role)));
    }

    let (width, height) = (specs[0].width, specs[0].height);
    if let Some(spec) = specs.iter().find(|s| s.width != width || s.height != height) {
        return Err(fail(FramebufferIssue::SizeMismatch {
            role: spec.role,
            width,
            height,
            found_width: spec.width,
            found_height: spec.height,
        }));
    }

    Ok(FramebufferGroup {
        kind,
        width,
        height,
        attachments: specs.to_vec(),
    })
}

/// All off-screen targets of one frame, sized to the output resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetSet {
    pub geometry: FramebufferGroup,
    pub lighting: FramebufferGroup,
    pub ssr: FramebufferGroup,
}

impl RenderTargetSet {
    /// The layout every frame renders with.
    pub fn standard(width: u32, height: u32) -> Result<Self, RenderError> {
        use AttachmentRole::*;

        let geometry = create_framebuffer_group(
            FramebufferKind::Geometry,
            &[
                AttachmentSpec::color(Normal, PixelFormat::Rgba16Float, 0, width, height),
                AttachmentSpec::color(Albedo, PixelFormat::Rgba8Unorm, 1, width, height),
                AttachmentSpec::color(Specular, PixelFormat::Rgba8Unorm, 2, width, height),
                AttachmentSpec::depth_stencil(width, height, AttachmentAccess::ReadWrite),
            ],
        )?;
        let lighting = create_framebuffer_group(
            FramebufferKind::Lighting,
            &[AttachmentSpec::color(LitColor, PixelFormat::Rgba8Unorm, 0, width, height)],
        )?;
        let ssr = create_framebuffer_group(
            FramebufferKind::Ssr,
            &[
                AttachmentSpec::color(ReflectionColor, PixelFormat::Rgba8Unorm, 0, width, height),
                AttachmentSpec::depth_stencil(width, height, AttachmentAccess::ReadOnly),
            ],
        )?;

        log::debug!("Render target set validated at {width}x{height}");
        Ok(Self {
            geometry,
            lighting,
            ssr,
        })
    }

    pub fn width(&self) -> u32 {
        self.geometry.width
    }

    pub fn height(&self) -> u32 {
        self.geometry.height
    }

    /// Format of the attachment playing `role`, wherever it lives.
    pub fn format(&self, role: AttachmentRole) -> Option<PixelFormat> {
        [&self.geometry, &self.lighting, &self.ssr]
            .into_iter()
            .find_map(|group| group.attachment(role))
            .map(|spec| spec.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AttachmentRole::*;

    fn issue(result: Result<FramebufferGroup, RenderError>) -> FramebufferIssue {
        match result {
            Err(RenderError::IncompleteFramebuffer { issue, .. }) => issue,
            other => panic!("expected IncompleteFramebuffer, got {other:?}"),
        }
    }

    fn geometry_specs(w: u32, h: u32) -> Vec<AttachmentSpec> {
        vec![
            AttachmentSpec::color(Normal, PixelFormat::Rgba16Float, 0, w, h),
            AttachmentSpec::color(Albedo, PixelFormat::Rgba8Unorm, 1, w, h),
            AttachmentSpec::color(Specular, PixelFormat::Rgba8Unorm, 2, w, h),
            AttachmentSpec::depth_stencil(w, h, AttachmentAccess::ReadWrite),
        ]
    }

    #[test]
    fn test_standard_set_is_complete() {
        let set = RenderTargetSet::standard(1280, 720).unwrap();
        assert_eq!(set.width(), 1280);
        assert_eq!(set.height(), 720);
        assert_eq!(set.format(Normal), Some(PixelFormat::Rgba16Float));
        assert_eq!(set.format(DepthStencil), Some(PixelFormat::Depth24PlusStencil8));
        assert_eq!(set.geometry.color_attachments().len(), 3);
        assert_eq!(set.geometry.color_attachments()[2].role, Specular);
        assert_eq!(
            set.ssr.depth_stencil().map(|d| d.access),
            Some(AttachmentAccess::ReadOnly)
        );
    }

    #[test]
    fn test_missing_attachment_is_reported() {
        let mut specs = geometry_specs(64, 64);
        specs.remove(1);
        assert_eq!(
            issue(create_framebuffer_group(FramebufferKind::Geometry, &specs)),
            FramebufferIssue::MissingAttachment(Albedo)
        );
    }

    #[test]
    fn test_size_mismatch_is_reported() {
        let mut specs = geometry_specs(64, 64);
        specs[2].width = 32;
        assert!(matches!(
            issue(create_framebuffer_group(FramebufferKind::Geometry, &specs)),
            FramebufferIssue::SizeMismatch { role: Specular, found_width: 32, .. }
        ));
    }

    #[test]
    fn test_duplicate_slot_is_reported() {
        let mut specs = geometry_specs(64, 64);
        specs[1].slot = AttachmentSlot::Color(0);
        assert_eq!(
            issue(create_framebuffer_group(FramebufferKind::Geometry, &specs)),
            FramebufferIssue::DuplicateSlot(AttachmentSlot::Color(0))
        );
    }

    #[test]
    fn test_depth_format_in_color_slot_is_reported() {
        let mut specs = geometry_specs(64, 64);
        specs[3].slot = AttachmentSlot::Color(3);
        assert!(matches!(
            issue(create_framebuffer_group(FramebufferKind::Geometry, &specs)),
            FramebufferIssue::FormatSlotMismatch { role: DepthStencil, .. }
        ));
    }

    #[test]
    fn test_color_format_in_depth_slot_is_reported() {
        let specs = [
            AttachmentSpec::color(ReflectionColor, PixelFormat::Rgba8Unorm, 0, 8, 8),
            AttachmentSpec {
                format: PixelFormat::Rgba8Unorm,
                ..AttachmentSpec::depth_stencil(8, 8, AttachmentAccess::ReadOnly)
            },
        ];
        assert!(matches!(
            issue(create_framebuffer_group(FramebufferKind::Ssr, &specs)),
            FramebufferIssue::FormatSlotMismatch { .. }
        ));
    }

    #[test]
    fn test_zero_size_and_foreign_roles_are_reported() {
        assert_eq!(
            issue(create_framebuffer_group(
                FramebufferKind::Lighting,
                &[AttachmentSpec::color(LitColor, PixelFormat::Rgba8Unorm, 0, 0, 720)],
            )),
            FramebufferIssue::ZeroSize(LitColor)
        );
        assert_eq!(
            issue(create_framebuffer_group(
                FramebufferKind::Lighting,
                &[AttachmentSpec::color(Normal, PixelFormat::Rgba16Float, 0, 8, 8)],
            )),
            FramebufferIssue::UnexpectedAttachment(Normal)
        );
        assert_eq!(
            issue(create_framebuffer_group(FramebufferKind::Lighting, &[])),
            FramebufferIssue::MissingAttachment(LitColor)
        );
    }

    #[test]
    fn test_standard_rejects_zero_resolution() {
        assert!(matches!(
            RenderTargetSet::standard(0, 720),
            Err(RenderError::IncompleteFramebuffer {
                kind: FramebufferKind::Geometry,
                ..
            })
        ));
    }
}
