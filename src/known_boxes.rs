use crate::boxes::FourCC;

macro_rules! known_boxes {
    ($( $variant:ident = $code:literal, $name:literal, $full:literal; )*) => {
        /// Typed view over the ISO-BMFF / QuickTime boxes the decoders know about.
        ///
        /// Anything not in this list becomes `KnownBox::Unknown(fourcc)`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum KnownBox {
            $( $variant, )*
            Unknown(FourCC),
        }

        impl From<FourCC> for KnownBox {
            fn from(cc: FourCC) -> Self {
                match &cc.0 {
                    $( $code => KnownBox::$variant, )*
                    _ => KnownBox::Unknown(cc),
                }
            }
        }

        impl KnownBox {
            pub fn full_name(&self) -> &'static str {
                match self {
                    $( KnownBox::$variant => $name, )*
                    KnownBox::Unknown(_) => "Unknown Box",
                }
            }

            /// Is this a FullBox (version + flags)?
            ///
            /// `meta` is not: QuickTime writes it as a plain container,
            /// ISO-BMFF as a FullBox. See [`ChildLayout::Detect`](crate::registry::ChildLayout::Detect).
            pub fn is_full_box(&self) -> bool {
                match self {
                    $( KnownBox::$variant => $full, )*
                    KnownBox::Unknown(_) => false,
                }
            }
        }
    };
}

known_boxes! {
    Ftyp = b"ftyp", "File Type Box", false;
    Moov = b"moov", "Movie Box", false;
    Mdat = b"mdat", "Media Data Box", false;
    Free = b"free", "Free Space Box", false;
    Skip = b"skip", "Skip Box", false;
    Wide = b"wide", "Wide Box", false;
    Meta = b"meta", "Meta Box", false;
    Uuid = b"uuid", "User Extension Box", false;

    Mvhd = b"mvhd", "Movie Header Box", true;
    Trak = b"trak", "Track Box", false;
    Udta = b"udta", "User Data Box", false;
    Tkhd = b"tkhd", "Track Header Box", true;
    Mdia = b"mdia", "Media Box", false;
    Mdhd = b"mdhd", "Media Header Box", true;
    Hdlr = b"hdlr", "Handler Reference Box", true;
    Minf = b"minf", "Media Information Box", false;
    Stbl = b"stbl", "Sample Table Box", false;

    // QuickTime metadata atoms
    Ilst = b"ilst", "Item List Atom", false;
    Data = b"data", "Data Atom", false;
    Keys = b"keys", "Metadata Item Keys Atom", true;
    Loci = b"loci", "Location Information Box", true;

    // HEIF
    Iprp = b"iprp", "Item Properties Box", false;
    Ipco = b"ipco", "Item Property Container Box", false;
    Ipma = b"ipma", "Item Property Association Box", true;
    Ispe = b"ispe", "Image Spatial Extents Box", true;
    Irot = b"irot", "Image Rotation Box", false;
    Pixi = b"pixi", "Pixel Information Box", true;
    Iinf = b"iinf", "Item Information Box", true;
    Iloc = b"iloc", "Item Location Box", true;
    Pitm = b"pitm", "Primary Item Box", true;
}
