use std::fmt;

/// How the slices of a series are ordered before stacking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Projection of ImagePositionPatient onto the slice normal.
    #[default]
    ImagePositionPatient,
    InstanceNumber,
    /// Keep the file order of the series.
    None,
}

/// The decoders the comparator runs side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DecoderKind {
    /// Raw single-file DICOM pixel decoder.
    Dicom,
    /// NIfTI decoder exposing the voxel-to-world affine and the header.
    Nifti,
    /// NIfTI decoder exposing origin, spacing and direction cosines.
    Itk,
}

impl DecoderKind {
    pub fn key(&self) -> &'static str {
        match self {
            DecoderKind::Dicom => "dicom",
            DecoderKind::Nifti => "nifti",
            DecoderKind::Itk => "itk",
        }
    }
}

impl fmt::Display for DecoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoderKind::Dicom => write!(f, "DICOM"),
            DecoderKind::Nifti => write!(f, "NIfTI"),
            DecoderKind::Itk => write!(f, "ITK"),
        }
    }
}

/// The two classes of the COVID classifier, in label order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Covid,
    NonCovid,
}

impl Class {
    pub const ALL: [Class; 2] = [Class::Covid, Class::NonCovid];

    pub fn from_label(label: usize) -> Option<Self> {
        match label {
            0 => Some(Class::Covid),
            1 => Some(Class::NonCovid),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Class::Covid => "COVID",
            Class::NonCovid => "NonCOVID",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_labels_follow_index_order() {
        let names: Vec<_> = Class::ALL.iter().map(Class::name).collect();
        assert_eq!(names, ["COVID", "NonCOVID"]);
        assert_eq!(Class::from_label(1), Some(Class::NonCovid));
        assert_eq!(Class::from_label(2), None);
    }

    #[test]
    fn decoder_kinds_are_ordered_dicom_first() {
        let mut kinds = vec![DecoderKind::Itk, DecoderKind::Dicom, DecoderKind::Nifti];
        kinds.sort();
        assert_eq!(kinds, [DecoderKind::Dicom, DecoderKind::Nifti, DecoderKind::Itk]);
    }
}
